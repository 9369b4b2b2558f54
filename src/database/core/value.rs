//! Values bound as statement parameters and decoded from result rows

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One result row, keyed by column name in result column order
pub type Record = IndexMap<String, SqlValue>;

/// A database value, independent of the backend it came from or goes to
///
/// Serializes to plain JSON: `Text("a")` becomes `"a"`, `Null` becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Bytes(v) => {
                write!(f, "\\x")?;
                for b in v {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Self::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Scalars map onto their SQL counterparts; arrays and objects stay JSON.
impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Json(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_untagged() {
        let mut record = Record::new();
        record.insert("tablename".to_string(), SqlValue::from("users"));
        record.insert("rows".to_string(), SqlValue::from(3i64));
        record.insert("note".to_string(), SqlValue::Null);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out, json!({"tablename": "users", "rows": 3, "note": null}));
    }

    #[test]
    fn test_from_json_value() {
        assert_eq!(SqlValue::from(json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from(json!(7)), SqlValue::Int(7));
        assert_eq!(SqlValue::from(json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::from(json!("x")), SqlValue::Text("x".into()));
        assert_eq!(
            SqlValue::from(json!({"a": 1})),
            SqlValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
        assert_eq!(SqlValue::from(Some("abc")).to_string(), "abc");
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }
}
