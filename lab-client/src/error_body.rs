use serde_json::Value;

/// Keys the evaluation service uses for its human-readable error text.
const DETAIL_KEYS: [&str; 3] = ["message", "detail", "error"];

/// Extracts the server-provided error payload from a non-success body.
///
/// A JSON object yields the first non-empty string under one of
/// [`DETAIL_KEYS`]; a JSON string yields itself; any other non-blank text is
/// taken verbatim. Returns `None` when nothing usable is present.
pub fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => DETAIL_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string),
        Ok(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}
