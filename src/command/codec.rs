//! Wire codec for joint commands
//!
//! Commands travel as UTF-8 JSON text encoding a single flat object.

use bytes::Bytes;
use serde_json::Value;

use super::joint::JointCommand;
use crate::error::{AppError, Result};

/// Encode a command as UTF-8 JSON text
pub fn encode(command: &JointCommand) -> Result<Bytes> {
    let text = serde_json::to_vec(command.as_map())?;
    Ok(Bytes::from(text))
}

/// Decode a command from channel payload bytes.
///
/// The payload must be a well-formed JSON object with primitive values.
/// Unknown keys are retained, never rejected.
pub fn decode(payload: &[u8]) -> Result<JointCommand> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| AppError::Decode(format!("invalid JSON: {}", e)))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(AppError::Decode(format!(
                "expected a flat object, got {}",
                type_name(&other)
            )))
        }
    };

    for (key, field) in &map {
        if field.is_object() || field.is_array() {
            return Err(AppError::Decode(format!(
                "nested value under key '{}'",
                key
            )));
        }
    }

    Ok(JointCommand::from_map(map))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_primitive_fields() {
        let command = JointCommand::new()
            .with_field("timestamp", 17i64)
            .with_field("joint1", 90i64)
            .with_field("joint2", 45.5f64)
            .with_field("mode", "absolute");

        let decoded = decode(&encode(&command).unwrap()).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(decoded.timestamp(), Some(17));
        assert_eq!(decoded.angle("joint2"), Some(45.5));
        assert_eq!(
            decoded.get("mode"),
            Some(&serde_json::Value::from("absolute"))
        );
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys_and_order() {
        let command = JointCommand::new()
            .with_field("timestamp", 0i64)
            .with_field("servo_torque_limit", 0.8f64)
            .with_field("joint1", 90i64);

        let decoded = decode(&encode(&command).unwrap()).unwrap();
        assert_eq!(decoded, command);
        let keys: Vec<&String> = decoded.keys().collect();
        assert_eq!(keys, ["timestamp", "servo_torque_limit", "joint1"]);
    }

    #[test]
    fn test_float_precision_survives() {
        let command = JointCommand::new().with_field("gripper", 0.30000000000000004f64);
        let decoded = decode(&encode(&command).unwrap()).unwrap();
        assert_eq!(decoded.angle("gripper"), Some(0.30000000000000004));
    }

    #[test]
    fn test_large_timestamps_survive() {
        let command = JointCommand::new().with_field("timestamp", i64::MAX);
        let decoded = decode(&encode(&command).unwrap()).unwrap();
        assert_eq!(decoded.timestamp(), Some(i64::MAX));
    }

    #[test]
    fn test_malformed_text_is_decode_error() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_non_object_is_decode_error() {
        let err = decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_nested_value_is_decode_error() {
        let err = decode(br#"{"joint1": {"angle": 90}}"#).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_empty_object_decodes() {
        let decoded = decode(b"{}").unwrap();
        assert!(decoded.is_empty());
    }
}
