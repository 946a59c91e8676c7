use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Mapping from key to decoded value
pub type Map = BTreeMap<String, Value>;

/// A decoded parameter or callable result.
///
/// Superset of JSON: tagged `Date` and `File` mappings become their own variants.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  /// `null`
  Null,
  /// `true` / `false`
  Bool(bool),
  /// Any JSON number
  Number(serde_json::Number),
  /// A string
  String(String),
  /// An ordered sequence
  Array(Vec<Value>),
  /// A mapping
  Object(Map),
  /// A reconstructed date
  Date(Date),
  /// An opaque file reference
  File(File),
}

/// A date reconstructed from `{"__type": "Date", "iso": ...}`
#[derive(Clone, Debug, PartialEq)]
pub struct Date {
  /// The instant
  pub at: DateTime<Utc>,
  /// Fields found on the tagged mapping besides `__type` and `iso`
  pub fields: Map,
}

/// A file reference reconstructed from `{"__type": "File", "name": ..., "url": ...}`
#[derive(Clone, Debug, PartialEq)]
pub struct File {
  /// Stored name of the file
  pub name: String,
  /// Location the file can be fetched from, if already uploaded
  pub url: Option<String>,
}

impl Date {
  /// A date with no leftover fields
  pub fn new(at: DateTime<Utc>) -> Self {
    Self { at,
           fields: Map::new() }
  }

  /// ISO-8601 text with millisecond precision, e.g. `2020-01-01T00:00:00.000Z`
  pub fn iso(&self) -> String {
    self.at.to_rfc3339_opts(SecondsFormat::Millis, true)
  }

  /// Look up a leftover field
  pub fn field(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }
}

impl Value {
  /// Get a mapping's entry
  pub fn get(&self, key: &str) -> Option<&Value> {
    match self {
      | Value::Object(map) => map.get(key),
      | Value::Date(date) => date.field(key),
      | _ => None,
    }
  }

  /// Borrow as a string slice
  pub fn as_str(&self) -> Option<&str> {
    match self {
      | Value::String(s) => Some(s),
      | _ => None,
    }
  }

  /// Borrow as a date
  pub fn as_date(&self) -> Option<&Date> {
    match self {
      | Value::Date(d) => Some(d),
      | _ => None,
    }
  }

  /// Borrow as a file reference
  pub fn as_file(&self) -> Option<&File> {
    match self {
      | Value::File(f) => Some(f),
      | _ => None,
    }
  }

  /// Convert to the JSON wire form, re-tagging dates and files
  pub fn to_wire(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }
}

impl From<serde_json::Value> for Value {
  /// Structural conversion; tagged mappings are left as mappings.
  /// Use [`crate::params::decode`] to interpret them.
  fn from(json: serde_json::Value) -> Self {
    use serde_json::Value as Json;

    match json {
      | Json::Null => Value::Null,
      | Json::Bool(b) => Value::Bool(b),
      | Json::Number(n) => Value::Number(n),
      | Json::String(s) => Value::String(s),
      | Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
      | Json::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self {
    Value::Number(n.into())
  }
}

impl From<Date> for Value {
  fn from(d: Date) -> Self {
    Value::Date(d)
  }
}

impl From<File> for Value {
  fn from(f: File) -> Self {
    Value::File(f)
  }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    match self {
      | Value::Null => ser.serialize_unit(),
      | Value::Bool(b) => ser.serialize_bool(*b),
      | Value::Number(n) => n.serialize(ser),
      | Value::String(s) => ser.serialize_str(s),
      | Value::Array(items) => items.serialize(ser),
      | Value::Object(map) => map.serialize(ser),
      | Value::Date(date) => {
        let mut map = ser.serialize_map(None)?;
        map.serialize_entry("__type", "Date")?;
        map.serialize_entry("iso", &date.iso())?;
        for (k, v) in date.fields.iter() {
          map.serialize_entry(k, v)?;
        }
        map.end()
      },
      | Value::File(file) => {
        let mut map = ser.serialize_map(None)?;
        map.serialize_entry("__type", "File")?;
        map.serialize_entry("name", &file.name)?;
        if let Some(url) = &file.url {
          map.serialize_entry("url", url)?;
        }
        map.end()
      },
    }
  }
}
