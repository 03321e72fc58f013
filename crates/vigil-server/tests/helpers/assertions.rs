//! Custom assertions para tests.

use serde_json::Value;

/// Verifica el cuerpo de error `{ "error": ..., "message": ... }`.
pub fn assert_error_body(json: &Value, error: &str) {
    assert!(json.is_object(), "Error body should be a JSON object");
    assert_eq!(json["error"], error, "Unexpected error kind in {}", json);
    assert!(
        json["message"].as_str().is_some_and(|m| !m.is_empty()),
        "Error body should carry a message: {}",
        json
    );
}

/// Verifica la respuesta de una invalidacion.
pub fn assert_invalidated(json: &Value, count: u64) {
    assert_eq!(json["invalidated"], count, "Unexpected count in {}", json);
    assert!(json["keys"].is_array(), "'keys' should be an array");
    assert!(json["message"].is_string(), "'message' should be a string");
}
