//! Tests for the response envelope

use super::*;
use pretty_assertions::assert_eq;
use sqldoctor_core::DoctorError;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    count: usize,
    names: Vec<String>,
}

#[test]
fn test_success_flattens_payload() {
    let response = ToolResponse::success(Payload {
        count: 1,
        names: vec!["master".to_string()],
    });
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "success": true,
            "error": null,
            "count": 1,
            "names": ["master"],
        })
    );
}

#[test]
fn test_failure_uses_default_payload() {
    let response: ToolResponse<Payload> = ToolResponse::failure("Connection timeout");
    assert!(!response.is_success());
    assert_eq!(response.error(), Some("Connection timeout"));
    assert_eq!(response.payload, Payload::default());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["count"], 0);
}

#[test]
fn test_from_result() {
    let ok: ToolResponse<Payload> = Ok(Payload::default()).into();
    assert!(ok.is_success());

    let err: ToolResponse<Payload> = Err(DoctorError::Query("Invalid object name 'x'".into())).into();
    assert_eq!(err.error(), Some("Query error: Invalid object name 'x'"));
}

#[test]
fn test_round_trip() {
    let json = r#"{"success":true,"error":null,"count":2,"names":["a","b"]}"#;
    let response: ToolResponse<Payload> = serde_json::from_str(json).unwrap();
    assert_eq!(response.payload.count, 2);
}
