use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::value::{Date, File, Map, Value};

/// Decoded request parameters
pub type Params = Map;

/// Reconstruct rich values from their tagged wire form.
///
/// Sequences and mappings are walked recursively. A mapping tagged
/// `"__type": "Date"` with a parseable `iso` becomes a [`Date`] carrying the
/// remaining fields; one tagged `"__type": "File"` with a `name` becomes a
/// [`File`]. A tagged mapping missing its payload is treated as a plain mapping.
pub fn decode(value: Value) -> Value {
  match value {
    | Value::Array(items) => Value::Array(items.into_iter().map(decode).collect()),
    | Value::Object(map) => {
      let tag = map.get("__type").and_then(Value::as_str).map(String::from);

      match tag.as_deref() {
        | Some("Date") => decode_date(map),
        | Some("File") => decode_file(map),
        | _ => Value::Object(decode_map(map)),
      }
    },
    | scalar => scalar,
  }
}

/// Decode every value of a mapping, keys untouched
pub fn decode_map(map: Map) -> Map {
  map.into_iter().map(|(k, v)| (k, decode(v))).collect()
}

/// Merge raw query and body parameters (body wins) and decode the result
pub fn from_request(body: serde_json::Map<String, serde_json::Value>,
                    query: serde_json::Map<String, serde_json::Value>)
                    -> Params {
  let mut merged = query;
  merged.extend(body);

  merged.into_iter().map(|(k, v)| (k, decode(Value::from(v)))).collect()
}

/// Offset-less forms are read as UTC; a bare date is midnight UTC
fn parse_iso(iso: &str) -> Option<DateTime<Utc>> {
  if let Ok(at) = DateTime::parse_from_rfc3339(iso) {
    return Some(at.with_timezone(&Utc));
  }

  let naive = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f").ok();
  let naive = naive.or_else(|| NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0));

  naive.map(|at| Utc.from_utc_datetime(&at))
}

fn decode_date(mut map: Map) -> Value {
  let at = map.get("iso").and_then(Value::as_str).and_then(parse_iso);

  match at {
    | Some(at) => {
      map.remove("__type");
      map.remove("iso");
      Value::Date(Date { at, fields: map })
    },
    | None => Value::Object(decode_map(map)),
  }
}

fn decode_file(map: Map) -> Value {
  let name = map.get("name").and_then(Value::as_str).map(String::from);
  let url = map.get("url").and_then(Value::as_str).map(String::from);

  match name {
    | Some(name) => Value::File(File { name, url }),
    | None => Value::Object(decode_map(map)),
  }
}
