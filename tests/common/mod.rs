#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Output base inside the workspace, as a string for `--out-base`.
    pub fn out_base(&self, name: &str) -> String {
        self.temp_dir.path().join(name).display().to_string()
    }

    /// Sorted names of every `.sql` file in the workspace.
    pub fn sql_files(&self) -> Vec<String> {
        let mut names = fs::read_dir(self.path())
            .expect("read workspace")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".sql"))
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("read output file")
    }
}

/// `INSERT` lines of a generated script.
pub fn insert_lines(script: &str) -> Vec<&str> {
    script
        .lines()
        .filter(|line| line.starts_with("INSERT INTO"))
        .collect()
}

/// Text between `VALUES (` and the closing `);` of an `INSERT` line.
pub fn values_of(line: &str) -> &str {
    let start = line.find("VALUES (").expect("VALUES clause") + "VALUES (".len();
    &line[start..line.len() - 2]
}
