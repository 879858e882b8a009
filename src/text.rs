use std::fs;
use std::path::Path;

use crate::error::TextError;

/// The text a user has to reproduce, normalized and split into chars
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceText {
    chars: Vec<char>,
}

impl ReferenceText {
    /// Normalize raw input. Returns `None` when nothing but whitespace remains.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }

        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        Some(Self {
            chars: normalized.trim_end().chars().collect(),
        })
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }
}

impl std::fmt::Display for ReferenceText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Read raw reference text from disk; normalization happens on `start`.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<String, TextError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| TextError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if raw.trim().is_empty() {
        return Err(TextError::Empty(path.to_path_buf()));
    }
    Ok(raw)
}
