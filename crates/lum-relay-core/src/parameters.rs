//! # Parameter Mapping
//!
//! Reduces an inbound call-tracking payload to the fields the webhook owner
//! opted into and applies the field renames the automation engine expects.

use crate::{Timestamp, PAYLOAD_SOURCE};
use serde_json::{Map, Value};

/// Field duplicated for the automation engine when present
pub const CAMPAIGN_NAME_FIELD: &str = "campaign_name";

/// Name the automation engine reads the campaign name from
pub const ENGINE_CAMPAIGN_NAME_FIELD: &str = "n8n_campaign_name";

/// Key of the metadata block appended to every mapped payload
pub const METADATA_FIELD: &str = "metadata";

/// Filter `payload` down to `selected` and decorate it for forwarding.
///
/// - Only keys present in both `selected` and `payload` are copied; selected
///   keys missing from the payload are dropped, never defaulted.
/// - A surviving `campaign_name` is duplicated under `n8n_campaign_name`.
/// - A `metadata` object with `processed_at` and `source` is always appended.
///
/// # Examples
///
/// ```rust
/// use lum_relay_core::map_parameters;
/// use serde_json::json;
///
/// let payload = json!({"campaign_name": "Spring", "caller_id": "+1555", "extra": 1});
/// let selected = vec!["campaign_name".to_string(), "caller_id".to_string()];
///
/// let mapped = map_parameters(payload.as_object().unwrap(), &selected);
/// assert_eq!(mapped["n8n_campaign_name"], json!("Spring"));
/// assert!(mapped.get("extra").is_none());
/// assert!(mapped.contains_key("metadata"));
/// ```
pub fn map_parameters(payload: &Map<String, Value>, selected: &[String]) -> Map<String, Value> {
    let mut mapped = Map::new();

    for name in selected {
        if let Some(value) = payload.get(name) {
            mapped.insert(name.clone(), value.clone());
        }
    }

    if let Some(campaign_name) = mapped.get(CAMPAIGN_NAME_FIELD).cloned() {
        mapped.insert(ENGINE_CAMPAIGN_NAME_FIELD.to_string(), campaign_name);
    }

    mapped.insert(
        METADATA_FIELD.to_string(),
        serde_json::json!({
            "processed_at": Timestamp::now().to_rfc3339(),
            "source": PAYLOAD_SOURCE,
        }),
    );

    mapped
}

/// Names from `required` that the payload does not carry, in `required` order.
///
/// A parameter counts as missing when the key is absent or its value is JSON
/// `null`. Falsy values such as `0`, `false` or `""` are accepted.
pub fn missing_required_parameters(payload: &Map<String, Value>, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| matches!(payload.get(name.as_str()), None | Some(Value::Null)))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "parameters_tests.rs"]
mod tests;
