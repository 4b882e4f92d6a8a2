use std::collections::HashMap;

use crate::config::{default_page_size, max_page_size};

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use postline::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/discover?after=p4&limit=2");
/// assert_eq!(params.get("after"), Some(&"p4".to_string()));
/// assert_eq!(params.get("limit"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a non-empty string parameter
pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|s| !s.is_empty()).cloned()
}

/// Get an integer parameter with validation and default
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params.get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

/// `limit` (clamped to the configured maximum) and `after` cursor of a page request
pub fn page_params(uri: &str) -> (usize, Option<String>) {
    let params = parse_query_params(uri);
    let limit = get_int(&params, "limit", default_page_size()).min(max_page_size());
    (limit, get_string(&params, "after"))
}
