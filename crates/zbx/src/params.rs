//! Request parameter helpers.
//!
//! Name-or-ID arguments follow one rule everywhere: a numeric string is an
//! ID, anything else is a name, and `*` means "match all" (clears both).
//! Multiple names go through the Zabbix `search` parameter with wildcards
//! enabled and `searchByAny` set.

use serde_json::{Map, Value, json};

use crate::error::ApiError;

/// JSON object used as the `params` member of a request.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Append a value to a list-valued key, promoting an existing scalar.
pub fn append_param(params: &mut Params, key: &str, value: Value) {
    let entry = params.entry(key.to_string()).or_insert_with(|| json!([]));
    if !entry.is_array() {
        let prior = entry.take();
        *entry = json!([prior]);
    }
    if let Some(list) = entry.as_array_mut() {
        list.push(value);
    }
}

/// Classify each name-or-ID and add it to `params`.
///
/// IDs land in `id_param`; names land in `search[name_param]` (wildcards,
/// any-match) when `search` is set, or in `filter[name_param]` otherwise.
/// A `*` anywhere clears the whole list, matching everything.
pub fn parse_name_or_id_arg(
    params: &mut Params,
    names_or_ids: &[String],
    name_param: &str,
    id_param: &str,
    search: bool,
) {
    if names_or_ids.iter().any(|n| n.trim() == "*") {
        return;
    }

    let mut names: Vec<Value> = Vec::new();
    for name_or_id in names_or_ids {
        let name_or_id = name_or_id.trim();
        if name_or_id.is_empty() {
            continue;
        }
        if name_or_id.chars().all(|c| c.is_ascii_digit()) {
            append_param(params, id_param, json!(name_or_id));
        } else {
            names.push(json!(name_or_id));
        }
    }

    if names.is_empty() {
        return;
    }
    if search {
        params.insert("search".to_string(), json!({ name_param: names }));
        params.insert("searchWildcardsEnabled".to_string(), json!(true));
        params.insert("searchByAny".to_string(), json!(true));
    } else {
        params.insert("filter".to_string(), json!({ name_param: names }));
    }
}

/// Common GET parameters: sorting and limits.
pub fn add_common_params(
    params: &mut Params,
    sort_field: Option<&str>,
    sort_order: Option<SortOrder>,
    limit: Option<u64>,
) {
    if let Some(field) = sort_field {
        params.insert("sortfield".to_string(), json!(field));
    }
    if let Some(order) = sort_order {
        params.insert("sortorder".to_string(), json!(order.as_str()));
    }
    if let Some(limit) = limit {
        params.insert("limit".to_string(), json!(limit));
    }
}

/// Extract the ID list bulk endpoints return, e.g. `{"hostids": [...]}`.
///
/// A missing key or a non-list value is a server contract violation and
/// reported as such; IDs are returned as strings even when the server sends
/// numbers.
pub fn returned_list(result: &Value, key: &str, endpoint: &str) -> Result<Vec<String>, ApiError> {
    let object = result.as_object().ok_or_else(|| {
        ApiError::request_other(format!(
            "expected endpoint {endpoint:?} to return an object, got {result}"
        ))
    })?;
    let list = object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ApiError::request_other(format!(
                "{endpoint:?} response did not contain a list for key {key:?}"
            ))
        })?;
    Ok(list.iter().map(value_to_id).collect())
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
