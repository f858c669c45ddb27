//! Parameter type definitions.
//!
//! This file contains the value and map types handed to the command
//! builder once the gear configuration has been filtered.

use serde_json::Number;
use std::fmt;

/// Value of a single application parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Text holding at most one whitespace-separated token
    String(String),
    /// Switch that is present only when true
    Bool(bool),
    /// Integer or floating point value
    Number(Number),
    /// Several values for one flag, e.g. `--modality T1w T2w`
    MultiValue(Vec<String>),
}

impl ParameterValue {
    /// Classify configuration text.
    ///
    /// Text that splits on whitespace into more than one piece becomes a
    /// `MultiValue`; anything else is kept verbatim as a `String`. A label
    /// that merely contains a space is split as well.
    pub fn from_text(text: &str) -> Self {
        let pieces: Vec<&str> = text.split_whitespace().collect();
        if pieces.len() > 1 {
            ParameterValue::MultiValue(pieces.into_iter().map(String::from).collect())
        } else {
            ParameterValue::String(text.to_string())
        }
    }

    /// Returns the numeric value as u64 when it is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParameterValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

/// String form used on the command line. Multi-values are re-joined with
/// single spaces.
impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => f.write_str(s),
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Number(n) => write!(f, "{}", n),
            ParameterValue::MultiValue(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        ParameterValue::Number(Number::from(value))
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Number(Number::from(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::from_text(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        ParameterValue::MultiValue(value)
    }
}

/// Insertion-ordered mapping from parameter name to value.
///
/// Re-inserting an existing name replaces the value in place, so the
/// name keeps its original position on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: ParameterValue,
    ) -> Option<ParameterValue> {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, ParameterValue)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (K, ParameterValue)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
