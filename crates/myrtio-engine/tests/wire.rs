//! Integration tests for hub topics and SAS token inspection.

use myrtio_engine::token::{SasToken, TokenError};
use myrtio_engine::topic::{command_filter, matches_filter, telemetry_topic, username};

#[test]
fn builds_hub_topics() {
    assert_eq!(
        telemetry_topic::<64>("dev").unwrap().as_str(),
        "devices/dev/messages/events/"
    );
    assert_eq!(
        command_filter::<64>("dev").unwrap().as_str(),
        "devices/dev/messages/devicebound/#"
    );
    assert_eq!(
        username::<96>("hub.azure-devices.net", "dev")
            .unwrap()
            .as_str(),
        "hub.azure-devices.net/dev/?api-version=2021-04-12"
    );
}

#[test]
fn oversized_names_are_rejected_instead_of_truncated() {
    assert!(telemetry_topic::<16>("dev").is_err());
    assert!(command_filter::<32>("dev").is_err());
    assert!(username::<24>("hub.azure-devices.net", "dev").is_err());
    assert_eq!(command_filter::<34>("dev").unwrap().len(), 34);
}

#[test]
fn multi_level_wildcard_matches_parent_and_children() {
    let filter = "devices/dev/messages/devicebound/#";

    assert!(matches_filter(filter, "devices/dev/messages/devicebound/"));
    assert!(matches_filter(filter, "devices/dev/messages/devicebound"));
    assert!(matches_filter(filter, "devices/dev/messages/devicebound/a/b"));
    assert!(!matches_filter(filter, "devices/dev/messages/events/"));
}

#[test]
fn single_level_wildcard_matches_one_level() {
    assert!(matches_filter("a/+/c", "a/b/c"));
    assert!(!matches_filter("a/+/c", "a/b/x/c"));
    assert!(!matches_filter("a/+", "a"));
}

#[test]
fn exact_filters_match_exactly() {
    assert!(matches_filter("a/b", "a/b"));
    assert!(!matches_filter("a/b", "a/b/c"));
    assert!(!matches_filter("a/b/c", "a/b"));
}

#[test]
fn wildcards_skip_system_topics() {
    assert!(!matches_filter("#", "$iothub/methods/POST/"));
    assert!(!matches_filter("+/methods/#", "$iothub/methods/POST/"));
    assert!(matches_filter("$iothub/methods/#", "$iothub/methods/POST/"));
}

#[test]
fn parses_device_token() {
    let token =
        SasToken::parse("SharedAccessSignature sr=hub%2Fdevices%2Fdev&sig=abc%3D&se=1700000000")
            .unwrap();

    assert_eq!(token.resource, "hub%2Fdevices%2Fdev");
    assert_eq!(token.signature, "abc%3D");
    assert_eq!(token.expiry, 1_700_000_000);
    assert_eq!(token.key_name, None);
}

#[test]
fn parses_policy_token_in_any_field_order() {
    let token =
        SasToken::parse("SharedAccessSignature se=42&skn=device&sig=s&sr=hub").unwrap();

    assert_eq!(token.expiry, 42);
    assert_eq!(token.key_name, Some("device"));
}

#[test]
fn rejects_malformed_tokens() {
    assert_eq!(
        SasToken::parse("sr=a&sig=b&se=1"),
        Err(TokenError::MissingPrefix)
    );
    assert_eq!(
        SasToken::parse("SharedAccessSignature sr=a&sig"),
        Err(TokenError::MalformedField)
    );
    assert_eq!(
        SasToken::parse("SharedAccessSignature se=1&sig=b"),
        Err(TokenError::MissingField("sr"))
    );
    assert_eq!(
        SasToken::parse("SharedAccessSignature sr=a&sig=b&se=-1"),
        Err(TokenError::InvalidExpiry)
    );
}
