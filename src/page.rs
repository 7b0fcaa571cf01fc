use std::cmp::Ordering;

use api::request::PageQuery;
use api::response::Page;
use serde::Serialize;
use serde_json::Value;

use crate::result::Result;

/// Filters, sorts and slices listing rows. Sorting goes through the JSON
/// form of a row, so `sort` names a wire field such as `startAt` or `inBytes`.
pub fn paginate<T: Serialize>(rows: Vec<T>, query: &PageQuery) -> Result<Page<Value>> {
    let mut rows = rows
        .into_iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let q = q.to_lowercase();
        rows.retain(|row| {
            ["path", "id"].iter().any(|key| {
                row.get(key)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&q))
            })
        });
    }

    if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
        rows.sort_by(|a, b| compare(a.get(sort), b.get(sort)));
    }
    if query
        .order
        .as_deref()
        .is_some_and(|order| order.starts_with("desc"))
    {
        rows.reverse();
    }

    let total = rows.len();
    let rows = rows
        .into_iter()
        .skip(query.start.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    Ok(Page { total, rows })
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
