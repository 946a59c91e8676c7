use crate::value::Value;

/// Turns callable results into their transport form
pub trait Encode: 'static + Send + Sync + std::fmt::Debug {
  /// Encode a value for the wire
  fn encode(&self, value: &Value) -> serde_json::Value;
}

/// JSON encoder that re-tags dates and files
#[derive(Clone, Copy, Debug, Default)]
pub struct Wire;

impl Encode for Wire {
  fn encode(&self, value: &Value) -> serde_json::Value {
    value.to_wire()
  }
}
