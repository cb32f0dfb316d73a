//! The value a module exports, independent of the engine that produced it.

use indexmap::IndexMap;
use std::{cmp::Ordering, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum ExportedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ExportedValue>),
    Object(IndexMap<String, ExportedValue>),
}

impl ExportedValue {
    /// Builds an object, enumerating integer-like keys first in ascending order and every
    /// other key in insertion order.
    pub fn object(mut entries: IndexMap<String, ExportedValue>) -> Self {
        entries.sort_by(|a, _, b, _| match (array_index(a), array_index(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Self::Object(entries)
    }

    /// Whether the flattener descends into this value instead of treating it as a leaf.
    ///
    /// Arrays only count when one of their items is itself nested.
    pub fn is_nested(&self) -> bool {
        match self {
            Self::Object(_) => true,
            Self::Array(items) => items
                .iter()
                .any(|item| matches!(item, Self::Object(_) | Self::Array(_))),
            _ => false,
        }
    }

    /// Own enumerable entries; arrays enumerate their indexes.
    pub fn entries(&self) -> Vec<(String, &ExportedValue)> {
        match self {
            Self::Object(map) => map.iter().map(|(key, value)| (key.clone(), value)).collect(),
            Self::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Value> for ExportedValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Stringifies the way the stylesheet expects to see scalars (`String(value)` semantics).
impl fmt::Display for ExportedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => fmt_number(*x, f),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    if *item != Self::Null {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => write!(f, "[object Object]"),
        }
    }
}

fn fmt_number(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        write!(f, "NaN")
    } else if x.is_infinite() {
        write!(f, "{}Infinity", if x < 0.0 { "-" } else { "" })
    } else if x == 0.0 {
        write!(f, "0")
    } else if x.fract() == 0.0 && x.abs() < 1e21 {
        write!(f, "{x:.0}")
    } else {
        write!(f, "{x}")
    }
}

/// Canonical array index (`"0"`, `"17"`, never `"01"`).
fn array_index(key: &str) -> Option<u32> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|index| *index != u32::MAX)
}
