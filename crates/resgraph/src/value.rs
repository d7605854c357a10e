//! Semi-structured resource payloads.
//!
//! Resource data is a closed value enum rather than an opaque `any` map:
//! references to other resources are a first-class variant, so discovering
//! them is an exhaustive match instead of runtime type introspection.

use crate::reference::PropertyRef;
use crate::urn::Urn;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed resource payload.
pub type ResourceData = BTreeMap<String, PropertyValue>;

/// One value inside a resource's data tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    /// A reference to another resource's eventual remote value.
    Ref(PropertyRef),
}

impl PropertyValue {
    /// Walk this value and append every embedded reference to `out`.
    ///
    /// Arbitrary nesting of maps and lists is supported; `Null` at any level
    /// simply contributes nothing.
    pub fn collect_references_into(&self, out: &mut Vec<PropertyRef>) {
        match self {
            Self::Ref(re) => out.push(re.clone()),
            Self::List(items) => {
                for item in items {
                    item.collect_references_into(out);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references_into(out);
                }
            }
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) => {}
        }
    }

    /// The value rendered as a plain string, as stored when binding a
    /// reference to it. Compound values render as JSON.
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Map(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
            Self::Ref(re) => re.value().unwrap_or_default().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Encode to JSON; references become `{"$ref": {"urn", "property"}}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(x) => serde_json::Value::from(*x),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Ref(re) => serde_json::json!({
                "$ref": {
                    "urn": re.urn().as_str(),
                    "property": re.property(),
                }
            }),
        }
    }

    /// Decode from JSON, recovering `$ref` markers as [`PropertyValue::Ref`].
    ///
    /// A `$ref` whose URN does not parse is kept as a plain map rather than
    /// dropped.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Int),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(entries) => {
                if let Some(re) = decode_ref(&entries) {
                    return Self::Ref(re);
                }
                Self::Map(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k, Self::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn decode_ref(entries: &serde_json::Map<String, serde_json::Value>) -> Option<PropertyRef> {
    if entries.len() != 1 {
        return None;
    }
    let marker = entries.get("$ref")?.as_object()?;
    let urn = Urn::parse(marker.get("urn")?.as_str()?)?;
    let property = marker.get("property")?.as_str()?;
    Some(PropertyRef::new(urn, property))
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_json(serde_json::Value::deserialize(
            deserializer,
        )?))
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<PropertyRef> for PropertyValue {
    fn from(re: PropertyRef) -> Self {
        Self::Ref(re)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyValue {
    fn from(entries: BTreeMap<String, PropertyValue>) -> Self {
        Self::Map(entries)
    }
}

/// Collect every reference embedded anywhere in `data`.
pub fn collect_references(data: &ResourceData) -> Vec<PropertyRef> {
    let mut out = Vec::new();
    for value in data.values() {
        value.collect_references_into(&mut out);
    }
    out
}
