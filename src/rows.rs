//! In-memory row model.
//!
//! A [`Row`] maps header names to raw cell text. Cells beyond the header width
//! are dropped, header names beyond the record width stay absent, and when a
//! header repeats a name the later cell wins.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn from_record<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let cells = headers
            .iter()
            .zip(values.iter())
            .map(|(h, v)| (h.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        Self { cells }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Cell value with a missing column read as the empty string.
    pub fn value_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }
}
