#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Decoding tests against payload shapes returned by the cloud service

use dacloud_json::{ErrorKind, JsonValue, decode, decode_file};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write;

const CLOUD_RESPONSE: &str = r#"{"properties":{"isBrowser":true,"browserName":"Chrome","displayWidth":1080,"model":"Pixel 7","osVersion":"14","isMobilePhone":true,"uaLanguage":null},"_debug":{"ms":3}}"#;

#[test]
fn decode_integer_array() {
    let map = decode(r#"{"test":[0,1,2,3,4]}"#).expect("Test operation should succeed");
    let list = map
        .get("test")
        .and_then(JsonValue::as_map)
        .expect("test should decode to an integer-keyed map");

    let keys: Vec<&str> = list.keys().map(String::as_str).collect();
    assert_eq!(keys, ["0", "1", "2", "3", "4"]);
    for (i, value) in list.values().enumerate() {
        assert_eq!(value, &JsonValue::Int(i32::try_from(i).unwrap()));
    }
}

#[test]
fn decode_bare_identifier_as_string() {
    let map = decode(r#"{"key": value}"#).expect("Bare identifiers should decode");
    assert_eq!(map.get("key"), Some(&JsonValue::from("value")));
}

#[test]
fn decode_cloud_properties() {
    let map = decode(CLOUD_RESPONSE).expect("Test operation should succeed");
    let properties = map
        .get("properties")
        .and_then(JsonValue::as_map)
        .expect("properties object");

    assert_eq!(properties.get("isBrowser"), Some(&JsonValue::Bool(true)));
    assert_eq!(properties.get("displayWidth"), Some(&JsonValue::Int(1080)));
    assert_eq!(properties.get("model"), Some(&JsonValue::from("Pixel 7")));
    // Quoted digits stay strings
    assert_eq!(properties.get("osVersion"), Some(&JsonValue::from("14")));
    assert!(properties.get("uaLanguage").is_none());

    let order: Vec<&str> = properties.keys().map(String::as_str).collect();
    assert_eq!(
        order,
        [
            "isBrowser",
            "browserName",
            "displayWidth",
            "model",
            "osVersion",
            "isMobilePhone"
        ]
    );
}

#[test]
fn decode_pretty_printed_payload() {
    let text = "{\n  \"properties\" : {\n    \"vendor\" : \"Google\",\n    \"year\" : 2022\n  }\n}\n";
    let map = decode(text).expect("Whitespace between tokens is accepted");
    let properties = map["properties"].as_map().expect("properties object");
    assert_eq!(properties["vendor"], JsonValue::from("Google"));
    assert_eq!(properties["year"], JsonValue::Int(2022));
}

#[test]
fn decode_nested_containers_share_cursor() {
    let map = decode("{a:{b:[1,{c:(x,y)}]},d:2}").expect("Test operation should succeed");
    let a = map["a"].as_map().expect("object");
    let b = a["b"].as_map().expect("array");
    let inner = b["1"].as_map().expect("object");
    let c = inner["c"].as_map().expect("array");
    assert_eq!(c["0"], JsonValue::from("x"));
    assert_eq!(c["1"], JsonValue::from("y"));
    assert_eq!(map["d"], JsonValue::Int(2));
}

#[test]
fn decode_ignores_trailing_text() {
    let map = decode("{\"a\":1} trailing").expect("Test operation should succeed");
    assert_eq!(map.len(), 1);
}

#[test]
fn decode_rejects_non_object() {
    let err = decode("\"just a string\"").expect_err("Top level must be an object");
    assert_eq!(err.kind(), ErrorKind::BadData);
    assert_eq!(err.message(), "A Json object text must begin with '{'");
}

#[test]
fn decode_file_reports_missing_file() {
    let dir = tempfile::tempdir().expect("Test operation should succeed");
    let err = decode_file(dir.path().join("absent.json")).expect_err("Missing file should fail");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.kind().code(), 300);
}

#[test]
fn decode_file_reads_payload() {
    let mut file = tempfile::NamedTempFile::new().expect("Test operation should succeed");
    file.write_all(CLOUD_RESPONSE.as_bytes())
        .expect("Test operation should succeed");

    let map = decode_file(file.path()).expect("Test operation should succeed");
    assert!(map.contains_key("properties"));
}

proptest! {
    /// Arbitrary input never panics the decoder
    #[test]
    fn decode_never_panics(input in ".{0,64}") {
        let _ = decode(&input);
    }

    /// Integers inside objects keep their exact value
    #[test]
    fn decode_preserves_integers(n in any::<i32>()) {
        let map = decode(&format!("{{\"n\":{n}}}")).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(map.get("n"), Some(&JsonValue::Int(n)));
    }

    /// Values beyond 32 bits widen to a long
    #[test]
    fn decode_widens_large_integers(n in (i64::from(i32::MAX) + 1)..i64::MAX) {
        let map = decode(&format!("{{\"n\":{n}}}")).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(map.get("n"), Some(&JsonValue::Long(n)));
    }
}
