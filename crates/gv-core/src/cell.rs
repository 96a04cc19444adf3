//! Cell values materialized into blocks

use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Value held by a single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<Vec<CellValue>> for CellValue {
    fn from(items: Vec<CellValue>) -> Self {
        CellValue::List(items)
    }
}

/// A materialized cell.
///
/// `raw` keeps the source text when the value had to be coerced
/// (booleans, nulls and objects become text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            raw: None,
        }
    }

    pub fn with_raw(value: impl Into<CellValue>, raw: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            raw: Some(raw.into()),
        }
    }

    /// Convert a decoded JSON value into a cell
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Cell::new(s.as_str()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Cell::new(f),
                None => Cell::with_raw(n.to_string(), n.to_string()),
            },
            Value::Array(items) => Cell::new(
                items
                    .iter()
                    .map(|item| Cell::from_json(item).value)
                    .collect::<Vec<_>>(),
            ),
            Value::Bool(b) => Cell::with_raw(b.to_string(), b.to_string()),
            Value::Null => Cell::with_raw(String::new(), "null"),
            Value::Object(_) => Cell::with_raw(value.to_string(), value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        assert_eq!(Cell::from_json(&json!(3)).value, CellValue::Number(3.0));
        assert_eq!(Cell::from_json(&json!("abc")).value.as_str(), Some("abc"));

        let list = Cell::from_json(&json!([1, "x"]));
        assert_eq!(
            list.value,
            CellValue::List(vec![CellValue::Number(1.0), CellValue::Text("x".into())])
        );
        assert!(list.raw.is_none());

        let flag = Cell::from_json(&json!(true));
        assert_eq!(flag.value.as_str(), Some("true"));
        assert_eq!(flag.raw.as_deref(), Some("true"));

        let null = Cell::from_json(&Value::Null);
        assert_eq!(null.value.as_str(), Some(""));
        assert_eq!(null.raw.as_deref(), Some("null"));
    }

    #[test]
    fn test_display() {
        let value = CellValue::List(vec![1.5.into(), "a".into()]);
        assert_eq!(value.to_string(), "[1.5, a]");
    }
}
