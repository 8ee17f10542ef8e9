//! Device properties and lookup results

use crate::error::{ClientError, Result};
use crate::registry::RankingStatus;
use dacloud_json::{JsonMap, JsonValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Boolean(bool),
    Integer(i32),
    String(String),
}

impl Property {
    /// Type name as reported by the other DeviceAtlas clients
    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
        }
    }

    /// Boolean value; `name` is only used in the error
    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            _ => Err(ClientError::IncorrectPropertyType {
                name: name.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Integer value; `name` is only used in the error
    pub fn as_int(&self, name: &str) -> Result<i32> {
        match self {
            Self::Integer(i) => Ok(*i),
            _ => Err(ClientError::IncorrectPropertyType {
                name: name.to_string(),
                expected: "integer",
            }),
        }
    }

    /// String value, only for string properties
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(b), Self::String(s)) | (Self::String(s), Self::Boolean(b)) => {
                let s = s.trim();
                if *b {
                    s == "1" || s.eq_ignore_ascii_case("true")
                } else {
                    s == "0" || s.eq_ignore_ascii_case("false")
                }
            }
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&JsonValue> for Property {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Bool(b) => Self::Boolean(*b),
            JsonValue::Int(i) => Self::Integer(*i),
            other => Self::String(other.to_string()),
        }
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Property {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Properties of one device, in the order the service returned them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, Property>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        self.0.insert(name.into(), value.into());
    }

    /// Whether `name` is present with a value equal to `value`.
    ///
    /// Comparison is on the displayed form, except that a boolean also
    /// matches `"true"`/`"false"`.
    pub fn contains(&self, name: &str, value: impl Into<Property>) -> bool {
        let value = value.into();
        self.0.get(name).is_some_and(|p| p.matches(&value))
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.0.iter()
    }
}

impl From<&JsonMap> for Properties {
    fn from(map: &JsonMap) -> Self {
        Self(
            map.iter()
                .map(|(name, value)| (name.clone(), Property::from(value)))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a String, &'a Property);
    type IntoIter = indexmap::map::Iter<'a, String, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Where a result came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    None,
    Cache,
    Cloud,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Cache => "cache",
            Self::Cloud => "cloud",
        })
    }
}

/// Outcome of a device lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceResult {
    pub source: Source,
    /// `None` when the service answered without usable properties
    pub properties: Option<Properties>,
    /// Endpoint that answered; only for cloud results
    pub cloud_url: Option<String>,
    /// Tier the endpoint list came from; only for cloud results
    pub ranking_status: Option<RankingStatus>,
}

impl DeviceResult {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }
}
