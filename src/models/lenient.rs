//! Forgiving field decoders for upstream payloads.
//!
//! LunarCrush is loose about numeric types: integer columns sometimes arrive
//! as floats or quoted strings. Every upstream field goes through [`field`],
//! which accepts any of those shapes and falls back to `None` instead of
//! failing the whole document.

use async_graphql::Json;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Conversion from an arbitrary JSON value, `None` when it does not fit
pub trait Lenient: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl Lenient for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            _ => None,
        }
    }
}

impl Lenient for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl Lenient for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }
}

impl Lenient for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Keeps the entries that convert, a lone scalar becomes a one element list
impl<T: Lenient> Lenient for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.into_iter().filter_map(T::from_value).collect()),
            Value::Null => None,
            other => T::from_value(other).map(|item| vec![item]),
        }
    }
}

impl Lenient for Json<Value> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(Json(other)),
        }
    }
}

pub fn field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Lenient,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(T::from_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Row {
        #[serde(deserialize_with = "field")]
        rank: Option<i64>,
        #[serde(deserialize_with = "field")]
        price: Option<f64>,
        #[serde(deserialize_with = "field")]
        id: Option<String>,
        #[serde(deserialize_with = "field")]
        tags: Option<Vec<String>>,
        #[serde(deserialize_with = "field")]
        extra: Option<Json<Value>>,
    }

    #[test]
    fn test_numbers_in_any_shape() {
        let row: Row = serde_json::from_value(json!({
            "rank": 12.9,
            "price": "64000.5",
            "id": 42,
            "tags": ["defi", 7, null],
            "extra": { "x": 1 }
        }))
        .unwrap();
        assert_eq!(row.rank, Some(12));
        assert_eq!(row.price, Some(64000.5));
        assert_eq!(row.id.as_deref(), Some("42"));
        assert_eq!(row.tags, Some(vec!["defi".to_string(), "7".to_string()]));
        assert_eq!(row.extra, Some(Json(json!({ "x": 1 }))));
    }

    #[test]
    fn test_garbage_becomes_none() {
        let row: Row = serde_json::from_value(json!({
            "rank": "n/a",
            "price": {},
            "id": null
        }))
        .unwrap();
        assert_eq!(row.rank, None);
        assert_eq!(row.price, None);
        assert_eq!(row.id, None);
        assert_eq!(row.tags, None);
        assert_eq!(row.extra, None);

        let row: Row = serde_json::from_value(json!({ "rank": "7", "tags": "solo" })).unwrap();
        assert_eq!(row.rank, Some(7));
        assert_eq!(row.tags, Some(vec!["solo".to_string()]));
    }
}
