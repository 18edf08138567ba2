use serde::{Deserialize, Deserializer, Serialize};

/// Body of a successful `POST /recommend`
///
/// Every field is defaulted so a minimally populated response still parses.
/// An explicit `null` counts as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stores: Vec<StoreRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scanned_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analyzed_count: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Store entry as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Human-readable detail, if the service sent one as a plain string
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}
