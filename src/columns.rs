//! Column Set finalization.
//!
//! The Column Set is derived once from the CSV header, the exclusion list and
//! the synthetic-key policy, and then shared by every chunk. When a synthetic
//! key column is generated it is always the first column, exactly once, even
//! if the header never mentioned it.

use itertools::Itertools;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSet {
    names: Vec<String>,
}

impl ColumnSet {
    pub fn finalize<S>(header: &[S], excludes: &[S], key: Option<&str>, generate: bool) -> Self
    where
        S: AsRef<str>,
    {
        let key = key.filter(|k| generate && !k.is_empty());
        let mut names = header
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !name.is_empty())
            .filter(|name| !excludes.iter().any(|ex| ex.as_ref() == *name))
            .filter(|name| Some(*name) != key)
            .unique()
            .map(str::to_string)
            .collect::<Vec<_>>();

        if let Some(key) = key {
            if !header.iter().any(|name| name.as_ref() == key) {
                debug!("Key column '{key}' is not in the header; adding it for generated ids");
            }
            names.insert(0, key.to_string());
        }

        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// Comma-joined names, as used in both the header comment and the
    /// `INSERT` column list.
    pub fn joined(&self) -> String {
        self.names.join(", ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
