//! # Row Records
//!
//! A [`RowRecord`] is one normalized unit of captured data: a repository, a
//! city's weather, a coin's price. Fields keep their insertion order, which is
//! also the column order of processed tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Scalar {
    /// Coerces a delimited-text cell back into a scalar.
    ///
    /// Integers win over floats. Anything unparsable stays text and the empty
    /// string is `Null`. The CSV reader only applies this to columns whose
    /// cells all survive the conversion.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Scalar::Int(i);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Scalar::Float(f),
            _ => Scalar::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value. Numeric text is accepted, which is how
    /// upstream APIs that quote their numbers are tolerated.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Scalar::Null => None,
        }
    }

    /// Integer view; floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            other => other.as_f64().map(|f| f as i64),
        }
    }

    /// Text view; `None` for `Null` only.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Null => Ok(()),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Ordered mapping from field name to [`Scalar`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    fields: Vec<(String, Scalar)>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.set(name, value);
        self
    }

    /// Inserts or replaces a field. Replacing keeps the original position.
    pub fn set(&mut self, name: &str, value: impl Into<Scalar>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Implemented by the typed records each source produces.
pub trait ToRow {
    fn to_row(&self) -> RowRecord;
}
