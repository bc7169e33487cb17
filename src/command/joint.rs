//! Joint command data structure

use serde_json::{Map, Value};

/// An ordered label -> value mapping describing one pose update.
///
/// The schema is application-defined: a timestamp, per-joint angles, a
/// gripper position, or anything else the peers agree on. Keys unknown to
/// this crate pass through untouched, and insertion order is preserved on
/// the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointCommand {
    fields: Map<String, Value>,
}

impl JointCommand {
    /// Create an empty command
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Create a command with a timestamp field
    pub fn with_timestamp(timestamp: i64) -> Self {
        let mut command = Self::new();
        command.set_timestamp(timestamp);
        command
    }

    /// Add a field, consuming and returning the command
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp field
    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.fields.insert("timestamp".to_string(), Value::from(timestamp));
    }

    /// Get the timestamp field, if present and integral
    pub fn timestamp(&self) -> Option<i64> {
        self.fields.get("timestamp").and_then(Value::as_i64)
    }

    /// Set a joint angle in degrees
    pub fn set_angle(&mut self, joint: impl Into<String>, degrees: f64) {
        self.fields.insert(joint.into(), Value::from(degrees));
    }

    /// Get a joint angle in degrees, if present and numeric
    pub fn angle(&self, joint: &str) -> Option<f64> {
        self.fields.get(joint).and_then(Value::as_f64)
    }

    /// Insert a raw field value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Get a raw field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the command has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Underlying map view
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl std::fmt::Display for JointCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(text) => write!(f, "{}", text),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut command = JointCommand::with_timestamp(42);
        command.set_angle("joint1", 90.0);

        assert_eq!(command.timestamp(), Some(42));
        assert_eq!(command.angle("joint1"), Some(90.0));
        assert_eq!(command.angle("joint2"), None);
    }

    #[test]
    fn test_integer_angles_read_as_f64() {
        let command = JointCommand::new().with_field("joint1", 90);
        assert_eq!(command.angle("joint1"), Some(90.0));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let command = JointCommand::new()
            .with_field("timestamp", 0)
            .with_field("joint1", 90)
            .with_field("gripper", 0.5);

        let keys: Vec<&String> = command.keys().collect();
        assert_eq!(keys, ["timestamp", "joint1", "gripper"]);
    }
}
