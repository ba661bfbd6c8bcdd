//! URL helpers: query string building and base URL joining.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::{Params, ParamsSerializer};

/// Characters escaped in query keys and values.
///
/// Mirrors `encodeURIComponent`, keeping `@ : $ , [ ]` readable.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'@')
    .remove(b':')
    .remove(b'$')
    .remove(b',')
    .remove(b'[')
    .remove(b']');

fn encode(component: &str) -> String {
    utf8_percent_encode(component, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Serialize parameters the default way.
///
/// `null` values are skipped, arrays become repeated `key[]=` entries and
/// nested objects are sent as JSON.
///
/// ```
/// use conduit_core::{Params, url::serialize_params};
/// use serde_json::json;
///
/// let params: Params = [("ids", json!([1, 2])), ("q", json!("a b")), ("skip", json!(null))]
///     .into_iter()
///     .collect();
/// assert_eq!(serialize_params(&params), "ids[]=1&ids[]=2&q=a+b");
/// ```
#[must_use]
pub fn serialize_params(params: &Params) -> String {
    let mut parts = Vec::new();
    for (key, value) in params.iter() {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = encode(&format!("{key}[]"));
                parts.extend(items.iter().map(|item| format!("{key}={}", encode(&scalar(item)))));
            }
            other => parts.push(format!("{}={}", encode(key), encode(&scalar(other)))),
        }
    }
    parts.join("&")
}

/// Append serialized parameters to `url`.
///
/// When there is something to append, the fragment is dropped and the query
/// is joined with `?` or `&` as needed.
#[must_use]
pub fn build_url(url: &str, params: Option<&Params>, serializer: Option<&ParamsSerializer>) -> String {
    let Some(params) = params else {
        return url.to_string();
    };
    let serialized = match serializer {
        Some(serializer) => serializer.serialize(params),
        None => serialize_params(params),
    };
    if serialized.is_empty() {
        return url.to_string();
    }

    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{serialized}")
}

/// Returns `true` if `url` has a scheme or is protocol-relative.
#[must_use]
pub fn is_absolute_url(url: &str) -> bool {
    let Some((prefix, _)) = url.split_once("//") else {
        return false;
    };
    if prefix.is_empty() {
        return true;
    }
    let Some(scheme) = prefix.strip_suffix(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Join a base URL and a relative URL with exactly one slash.
#[must_use]
pub fn combine_urls(base_url: &str, relative_url: &str) -> String {
    if relative_url.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative_url.trim_start_matches('/')
    )
}

/// Resolve `url` against `base_url`, unless `url` is already absolute.
#[must_use]
pub fn build_full_path(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base_url) if !is_absolute_url(url) => combine_urls(base_url, url),
        _ => url.to_string(),
    }
}
