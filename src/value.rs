//! Canonical representation of spec data.
//!
//! JSON and YAML decoders produce different value trees (YAML allows
//! non-text mapping keys and tagged values). Both are normalised once, at
//! load time, into a [`SpecValue`] whose mapping keys are always text, so
//! templates and the `json` helpers see identical data whatever the source
//! format was.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// A scalar leaf of the spec tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

/// Normalised spec value: text-keyed mappings, sequences and scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SpecValue {
    Mapping(BTreeMap<String, SpecValue>),
    Sequence(Vec<SpecValue>),
    Scalar(Scalar),
}

impl SpecValue {
    pub fn empty_mapping() -> Self {
        SpecValue::Mapping(BTreeMap::new())
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        SpecValue::Scalar(Scalar::Text(text.into()))
    }

    /// Looks up a key when `self` is a mapping.
    pub fn get(&self, key: &str) -> Option<&SpecValue> {
        match self {
            SpecValue::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SpecValue::Scalar(Scalar::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[SpecValue]> {
        match self {
            SpecValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, SpecValue>> {
        match self {
            SpecValue::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

/// Conversion of a decoded document into a [`SpecValue`].
pub trait Normalize {
    /// Converts `self` into canonical form.
    ///
    /// # Errors
    /// * `Error::NonTextKeyError` if a mapping key has no text representation
    fn normalize(&self) -> Result<SpecValue>;
}

impl Normalize for SpecValue {
    fn normalize(&self) -> Result<SpecValue> {
        Ok(self.clone())
    }
}

impl Normalize for serde_json::Value {
    fn normalize(&self) -> Result<SpecValue> {
        Ok(from_json(self))
    }
}

impl Normalize for serde_yaml::Value {
    fn normalize(&self) -> Result<SpecValue> {
        from_yaml(self, &mut Location::root())
    }
}

fn json_number(number: &serde_json::Number) -> Scalar {
    if let Some(n) = number.as_i64() {
        Scalar::Integer(n)
    } else if let Some(n) = number.as_u64() {
        Scalar::Unsigned(n)
    } else {
        Scalar::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

fn yaml_number(number: &serde_yaml::Number) -> Scalar {
    if let Some(n) = number.as_i64() {
        Scalar::Integer(n)
    } else if let Some(n) = number.as_u64() {
        Scalar::Unsigned(n)
    } else {
        Scalar::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

fn from_json(value: &serde_json::Value) -> SpecValue {
    match value {
        serde_json::Value::Null => SpecValue::Scalar(Scalar::Null),
        serde_json::Value::Bool(b) => SpecValue::Scalar(Scalar::Bool(*b)),
        serde_json::Value::Number(n) => SpecValue::Scalar(json_number(n)),
        serde_json::Value::String(s) => SpecValue::text(s.as_str()),
        serde_json::Value::Array(items) => SpecValue::Sequence(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => SpecValue::Mapping(
            map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect(),
        ),
    }
}

/// Path of the node being normalised, used in error messages (`$.a.b[2]`).
struct Location(Vec<String>);

impl Location {
    fn root() -> Self {
        Location(Vec::new())
    }

    fn render(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.0 {
            out.push_str(segment);
        }
        out
    }
}

fn from_yaml(value: &serde_yaml::Value, location: &mut Location) -> Result<SpecValue> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => SpecValue::Scalar(Scalar::Null),
        Value::Bool(b) => SpecValue::Scalar(Scalar::Bool(*b)),
        Value::Number(n) => SpecValue::Scalar(yaml_number(n)),
        Value::String(s) => SpecValue::text(s.as_str()),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                location.0.push(format!("[{index}]"));
                let normalized = from_yaml(item, location);
                location.0.pop();
                out.push(normalized?);
            }
            SpecValue::Sequence(out)
        }
        Value::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (key, item) in map {
                let key = yaml_key(key, location)?;
                location.0.push(format!(".{key}"));
                let normalized = from_yaml(item, location);
                location.0.pop();
                out.insert(key, normalized?);
            }
            SpecValue::Mapping(out)
        }
        // Tags carry no meaning for templates; keep the tagged value.
        Value::Tagged(tagged) => from_yaml(&tagged.value, location)?,
    })
}

fn yaml_key(key: &serde_yaml::Value, location: &Location) -> Result<String> {
    use serde_yaml::Value;

    let key_kind = match key {
        Value::String(s) => return Ok(s.clone()),
        Value::Number(n) => return Ok(n.to_string()),
        Value::Bool(b) => return Ok(b.to_string()),
        Value::Null => "null",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    };
    Err(Error::NonTextKeyError { location: location.render(), key_kind })
}
