//! System parameters passed to evaluate functions.
//!
//! [`SystemParams`] is an insertion-ordered mapping. The order matters: the
//! cache key lists parameter values in the order they were declared.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParamError;

/// A single system parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    List(Vec<f64>),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            ParamValue::List(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(flag) => write!(f, "{flag}"),
            ParamValue::Number(value) => f.write_str(&format_float(*value)),
            ParamValue::List(values) => {
                let items: Vec<String> = values.iter().map(|v| format_float(*v)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::List(values)
    }
}

impl From<bool> for ParamValue {
    fn from(flag: bool) -> Self {
        ParamValue::Flag(flag)
    }
}

impl From<&str> for ParamValue {
    fn from(text: &str) -> Self {
        ParamValue::Text(text.to_string())
    }
}

/// Formats a float so integral values keep a `.0` suffix (`1.0`, not `1`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Ordered key/value parameters of the system under test
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemParams {
    entries: Vec<(String, ParamValue)>,
}

impl SystemParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`SystemParams::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a numeric parameter
    pub fn number(&self, name: &str) -> Result<f64, ParamError> {
        self.get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))?
            .as_number()
            .ok_or_else(|| ParamError::NotANumber(name.to_string()))
    }

    /// Look up one element of a list parameter
    pub fn element(&self, name: &str, index: usize) -> Result<f64, ParamError> {
        self.get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))?
            .as_list()
            .and_then(|values| values.get(index).copied())
            .ok_or_else(|| ParamError::NotIndexable {
                name: name.to_string(),
                index,
            })
    }

    /// Set a swept variable.
    ///
    /// With an index, the parameter is treated as a list: a missing
    /// parameter is created and a short list is extended with zeros.
    pub fn apply(&mut self, name: &str, index: Option<usize>, value: f64) -> Result<(), ParamError> {
        let Some(index) = index else {
            self.insert(name, value);
            return Ok(());
        };

        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, ParamValue::List(values))) => {
                if values.len() <= index {
                    values.resize(index + 1, 0.0);
                }
                values[index] = value;
                Ok(())
            }
            Some(_) => Err(ParamError::NotIndexable {
                name: name.to_string(),
                index,
            }),
            None => {
                let mut values = vec![0.0; index + 1];
                values[index] = value;
                self.entries.push((name.to_string(), ParamValue::List(values)));
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &ParamValue> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for SystemParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = SystemParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl Serialize for SystemParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct SystemParamsVisitor;

impl<'de> Visitor<'de> for SystemParamsVisitor {
    type Value = SystemParams;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of parameter names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut params = SystemParams::new();
        while let Some((key, value)) = access.next_entry::<String, ParamValue>()? {
            params.insert(key, value);
        }
        Ok(params)
    }
}

impl<'de> Deserialize<'de> for SystemParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SystemParamsVisitor)
    }
}
