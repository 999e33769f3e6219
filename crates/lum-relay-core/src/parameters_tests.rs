//! Tests for parameter mapping.

use super::*;
use serde_json::json;

fn selected(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_copies_only_selected_fields_present_in_payload() {
    let payload = object(json!({
        "campaign_id": "42",
        "caller_id": "+15550001",
        "duration": 93,
    }));

    let mapped = map_parameters(&payload, &selected(&["campaign_id", "recording_url"]));

    assert_eq!(mapped.get("campaign_id"), Some(&json!("42")));
    assert!(mapped.get("recording_url").is_none(), "missing keys are not defaulted");
    assert!(mapped.get("caller_id").is_none());
    assert!(mapped.get("duration").is_none());
}

#[test]
fn test_campaign_name_is_duplicated_for_engine() {
    let payload = object(json!({"campaign_name": "Spring Promo"}));

    let mapped = map_parameters(&payload, &selected(&["campaign_name"]));

    assert_eq!(mapped.get("campaign_name"), Some(&json!("Spring Promo")));
    assert_eq!(mapped.get("n8n_campaign_name"), Some(&json!("Spring Promo")));
}

#[test]
fn test_campaign_name_not_duplicated_when_not_selected() {
    let payload = object(json!({"campaign_name": "Spring Promo", "campaign_id": "1"}));

    let mapped = map_parameters(&payload, &selected(&["campaign_id"]));

    assert!(mapped.get("n8n_campaign_name").is_none());
}

#[test]
fn test_metadata_block_always_appended() {
    let mapped = map_parameters(&Map::new(), &[]);

    let metadata = mapped.get("metadata").and_then(Value::as_object).unwrap();
    assert_eq!(metadata.get("source"), Some(&json!("lum-webhook-service")));

    let processed_at = metadata.get("processed_at").and_then(Value::as_str).unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(processed_at).is_ok());
    assert_eq!(mapped.len(), 1);
}

#[test]
fn test_output_keys_are_bounded_by_selection_and_payload() {
    let payload = object(json!({
        "campaign_name": "X",
        "campaign_id": "1",
        "agent": "alice",
        "tags": ["a", "b"],
    }));
    let chosen = selected(&["campaign_name", "tags", "not_in_payload"]);

    let mapped = map_parameters(&payload, &chosen);

    for key in mapped.keys() {
        let allowed = (chosen.contains(key) && payload.contains_key(key))
            || key == "n8n_campaign_name"
            || key == "metadata";
        assert!(allowed, "unexpected key {key}");
    }
}

#[test]
fn test_remapping_output_keeps_selected_subset() {
    let payload = object(json!({
        "campaign_name": "X",
        "campaign_id": "1",
        "recording_url": "http://r",
        "noise": true,
    }));
    let chosen = selected(&["campaign_name", "campaign_id", "recording_url"]);

    let first = map_parameters(&payload, &chosen);
    let second = map_parameters(&first, &chosen);

    for name in &chosen {
        assert_eq!(first.get(name), second.get(name));
    }
    assert_eq!(first.get("n8n_campaign_name"), second.get("n8n_campaign_name"));
}

#[test]
fn test_missing_required_parameters_lists_absent_and_null() {
    let payload = object(json!({
        "campaign_name": "X",
        "recording_url": null,
    }));
    let required = selected(&["campaign_name", "campaign_id", "recording_url"]);

    let missing = missing_required_parameters(&payload, &required);

    assert_eq!(missing, vec!["campaign_id".to_string(), "recording_url".to_string()]);
}

#[test]
fn test_missing_required_parameters_accepts_falsy_values() {
    let payload = object(json!({
        "campaign_name": "",
        "campaign_id": 0,
        "recording_url": false,
    }));
    let required = selected(&["campaign_name", "campaign_id", "recording_url"]);

    assert!(missing_required_parameters(&payload, &required).is_empty());
}
