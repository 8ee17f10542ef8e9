//! Decoded value model

use indexmap::IndexMap;
use std::fmt;

/// Insertion-ordered mapping produced for objects and arrays.
///
/// Arrays are represented with the decimal indices `"0"`, `"1"`, ... as keys.
pub type JsonMap = IndexMap<String, JsonValue>;

/// A single decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Bool(bool),
    /// Numeric literal that fits in 32 bits
    Int(i32),
    /// Numeric literal that only fits in 64 bits
    Long(i64),
    Double(f64),
    String(String),
    Object(JsonMap),
    /// Array decoded as an integer-keyed map
    Array(JsonMap),
    /// Placeholder for an empty array slot or an explicit `null` element
    Null,
}

impl JsonValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value, widening `Int` to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            #[allow(clippy::cast_precision_loss)]
            Self::Long(l) => Some(*l as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the underlying map of an object or an array
    pub fn as_map(&self) -> Option<&JsonMap> {
        match self {
            Self::Object(map) | Self::Array(map) => Some(map),
            _ => None,
        }
    }

    /// Consume the value, returning the map of an object or an array
    pub fn into_map(self) -> Option<JsonMap> {
        match self {
            Self::Object(map) | Self::Array(map) => Some(map),
            _ => None,
        }
    }

    /// Array elements in index order
    pub fn array_values(&self) -> Option<Vec<&Self>> {
        match self {
            Self::Array(map) => Some(map.values().collect()),
            _ => None,
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
            Self::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_quoted(f, key)?;
                    f.write_str(":")?;
                    write_nested(f, value)?;
                }
                f.write_str("}")
            }
            Self::Array(map) => {
                f.write_str("[")?;
                for (i, value) in map.values().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_nested(f, value)?;
                }
                f.write_str("]")
            }
        }
    }
}

// Strings print bare at the top level so that `to_string()` on a scalar
// gives its plain text, but are quoted inside containers.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &JsonValue) -> fmt::Result {
    match value {
        JsonValue::String(s) => write_quoted(f, s),
        other => write!(f, "{other}"),
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c < ' ' => write!(f, "\\u{:04x}", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for JsonValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(JsonValue::Int(5).as_i64(), Some(5));
        assert_eq!(JsonValue::Long(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(JsonValue::Int(2).as_f64(), Some(2.0));
        assert_eq!(JsonValue::Bool(true).as_bool(), Some(true));
        assert_eq!(JsonValue::from("x").as_str(), Some("x"));
        assert!(JsonValue::Null.is_null());
        assert!(JsonValue::Int(1).as_map().is_none());
    }

    #[test]
    fn test_display_nested() {
        let mut inner = JsonMap::new();
        inner.insert("0".to_string(), JsonValue::Int(1));
        inner.insert("1".to_string(), JsonValue::from("two"));
        inner.insert("2".to_string(), JsonValue::Null);

        let mut map = JsonMap::new();
        map.insert("list".to_string(), JsonValue::Array(inner));
        map.insert("quote".to_string(), JsonValue::from("a\"b"));
        map.insert("flag".to_string(), JsonValue::Bool(false));

        let value = JsonValue::Object(map);
        assert_eq!(
            value.to_string(),
            r#"{"list":[1,"two",null],"quote":"a\"b","flag":false}"#
        );
    }

    #[test]
    fn test_top_level_string_is_bare() {
        assert_eq!(JsonValue::from("plain").to_string(), "plain");
    }
}
