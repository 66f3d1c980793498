//! Query evaluation
//!
//! Exact-match filtering on top-level document fields.
//!
//! Values are compared by their JSON type: the number `1` never matches the
//! string `"1"`, while the integer `1` does match the float `1.0`.

use serde_json::{Map, Value};

use crate::document::Document;

/// Field name → required value
pub type Filter = Map<String, Value>;

/// Whether `data` satisfies every pair in `filter`
///
/// An empty filter matches everything. Non-object payloads have no top-level
/// fields and therefore only match an empty filter.
pub fn matches_filter(data: &Value, filter: &Filter) -> bool {
    if filter.is_empty() {
        return true;
    }

    let Some(fields) = data.as_object() else {
        return false;
    };

    filter.iter().all(|(key, expected)| {
        fields
            .get(key)
            .map(|actual| values_equal(actual, expected))
            .unwrap_or(false)
    })
}

/// Typed equality between two JSON values
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            // Integers compare exactly; anything involving a float compares as f64
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a == b
            } else {
                match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, a)| {
                    b.get(key).map(|b| values_equal(a, b)).unwrap_or(false)
                })
        }
        _ => false,
    }
}

/// Select matching documents, ascending by ID, truncated to `limit` when non-zero
pub fn select<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    filter: &Filter,
    limit: usize,
) -> Vec<Document> {
    let mut matched: Vec<&Document> = documents
        .into_iter()
        .filter(|doc| matches_filter(&doc.data, filter))
        .collect();

    matched.sort_by(|a, b| a.id.cmp(&b.id));
    if limit > 0 {
        matched.truncate(limit);
    }

    matched.into_iter().cloned().collect()
}
