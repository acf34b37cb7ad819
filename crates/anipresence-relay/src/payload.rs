use serde::Deserialize;

use anipresence_core::config::RelayConfig;

/// Query string of `GET /setRPC`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcQuery {
    pub service: Option<String>,
    pub product: Option<String>,
    /// Epoch millis the playback clock started at; `0` means none.
    pub timestamp: Option<i64>,
    #[serde(rename = "sImgKey")]
    pub small_image_key: Option<String>,
    #[serde(rename = "isIdle", default)]
    pub is_idle: bool,
}

/// Activity shown in the presence client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub details: String,
    pub state: String,
    pub start_timestamp: Option<i64>,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: Option<String>,
}

impl PresencePayload {
    /// Shape the activity for `query`. `None` means the presence should be cleared.
    pub fn from_query(query: &RpcQuery, config: &RelayConfig) -> Option<Self> {
        if query.is_idle {
            return None;
        }
        let product = query.product.as_deref().map(str::trim).unwrap_or_default();
        if product.is_empty() {
            return None;
        }

        let state = match query.service.as_deref() {
            Some(service) if !service.is_empty() => format!("on {service}"),
            _ => String::new(),
        };

        Some(Self {
            details: format!("Now watching {product}"),
            state,
            start_timestamp: query.timestamp.filter(|&ts| ts != 0),
            large_image_key: config.large_image_key.clone(),
            large_image_text: config.large_image_text.clone(),
            small_image_key: query.small_image_key.clone().filter(|k| !k.is_empty()),
        })
    }
}
