use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;
const BODY_PREVIEW_CHARS: usize = 180;

pub const USER_AGENT: &str = concat!("tender-oracle/", env!("CARGO_PKG_VERSION"));

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{target} returned {status}: {preview}")]
    Status {
        target: String,
        status: StatusCode,
        preview: String,
    },
    #[error("invalid JSON from {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: serde_json::Error,
    },
}

/// GET `url` and decode the body as JSON. Errors name the endpoint by
/// `target` and drop the request URL, so query-string credentials never
/// reach error text.
pub async fn fetch_json(url: &str, target: &str) -> Result<Value, FetchError> {
    let response = HTTP_CLIENT
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            target: target.to_string(),
            source: source.without_url(),
        })?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| FetchError::Transport {
            target: target.to_string(),
            source: source.without_url(),
        })?;
    if !status.is_success() {
        return Err(FetchError::Status {
            target: target.to_string(),
            status,
            preview: preview(&body),
        });
    }
    serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        target: target.to_string(),
        source,
    })
}

pub fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

pub fn object_get_case_insensitive<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub fn object_path_value<'a>(object: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = object_get_case_insensitive(object, first)?;
    for segment in segments {
        let nested = current.as_object()?;
        current = object_get_case_insensitive(nested, segment)?;
    }
    Some(current)
}

pub fn string_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<String> {
    for path in paths {
        let Some(value) = object_path_value(object, path) else {
            continue;
        };
        match value {
            Value::String(s) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Value::Number(n) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

pub fn number_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .filter_map(|path| object_path_value(object, path))
        .find_map(to_f64)
}

/// Lenient numeric read. Sentinels such as `"-"` or `""` yield `None`.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let sanitized = s.trim().replace(',', "").replace('_', "");
            sanitized.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{number_from_paths, string_from_paths, to_f64};

    #[test]
    fn sentinel_strings_are_not_numbers() {
        assert_eq!(to_f64(&json!("-")), None);
        assert_eq!(to_f64(&json!("")), None);
        assert_eq!(to_f64(&json!(null)), None);
        assert_eq!(to_f64(&json!("57")), Some(57.0));
        assert_eq!(to_f64(&json!("1,250")), Some(1250.0));
    }

    #[test]
    fn reads_nested_paths_case_insensitively() {
        let payload = json!({ "Station": { "Name": "Medeu", "uid": 42 } });
        let object = payload.as_object().expect("object");
        assert_eq!(
            string_from_paths(object, &["station.name"]),
            Some("Medeu".to_string())
        );
        assert_eq!(string_from_paths(object, &["missing", "station.uid"]), Some("42".to_string()));
        assert_eq!(number_from_paths(object, &["station.uid"]), Some(42.0));
    }
}
