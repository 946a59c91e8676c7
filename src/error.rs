use std::fmt;

use serde::{ser::SerializeStruct, Serialize, Serializer};

/// Kind of a typed error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
  /// Callable missing, or callable / validator failed with a non-typed error
  ScriptFailed,
  /// Validator rejected the request
  ValidationFailed,
  /// Any other wire error code, raised explicitly by a callable
  Code(u32),
}

impl Kind {
  /// Numeric wire code
  pub fn code(&self) -> u32 {
    match self {
      | Kind::ScriptFailed => 141,
      | Kind::ValidationFailed => 142,
      | Kind::Code(code) => *code,
    }
  }
}

/// A typed (kind, message) error; the only form that leaves this crate on an error channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
  /// Error kind
  pub kind: Kind,
  /// Human-readable message
  pub message: String,
}

impl Error {
  /// Create a new typed error
  pub fn new(kind: Kind, message: impl ToString) -> Self {
    Self { kind,
           message: message.to_string() }
  }

  /// `ScriptFailed(message)`
  pub fn script_failed(message: impl ToString) -> Self {
    Self::new(Kind::ScriptFailed, message)
  }

  /// `ValidationFailed(message)`
  pub fn validation_failed(message: impl ToString) -> Self {
    Self::new(Kind::ValidationFailed, message)
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.message, self.kind.code())
  }
}

impl std::error::Error for Error {}

impl Serialize for Error {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    let mut s = ser.serialize_struct("Error", 2)?;
    s.serialize_field("code", &self.kind.code())?;
    s.serialize_field("error", &self.message)?;
    s.end()
  }
}

/// An error declared by application code, whose message is safe to show callers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudError {
  /// Message shown to the caller
  pub message: String,
}

impl CloudError {
  /// Create a new cloud error
  pub fn new(message: impl ToString) -> Self {
    Self { message: message.to_string() }
  }
}

/// An unexpected runtime fault. Its detail must never reach the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
  /// Short description
  pub message: String,
  /// Full detail for crash reporting
  pub trace: String,
}

impl Fault {
  /// Capture a runtime error
  pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
    let mut trace = format!("{:#?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
      trace.push_str(&format!("\ncaused by: {}", cause));
      source = cause.source();
    }

    Self { message: err.to_string(),
           trace }
  }

  /// Capture a panic payload
  pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
    let message = payload.downcast_ref::<&str>()
                         .map(|s| s.to_string())
                         .or_else(|| payload.downcast_ref::<String>().cloned())
                         .unwrap_or_else(|| "unknown panic".into());

    Self { trace: format!("panicked: {}", message),
           message }
  }
}

/// Anything a callable or validator may fail with.
///
/// Normalized in variant order by [`crate::respond`] and [`Failure::into_job_error`].
#[derive(Clone, Debug, PartialEq)]
pub enum Failure {
  /// Already typed; forwarded unchanged
  Typed(Error),
  /// A plain message
  Message(String),
  /// An application-declared error
  Cloud(CloudError),
  /// An unexpected internal fault
  Fault(Fault),
  /// Any other value
  Other(serde_json::Value),
}

impl Failure {
  /// Capture an unexpected runtime error as a fault
  pub fn fault<E: std::error::Error + ?Sized>(err: &E) -> Self {
    Failure::Fault(Fault::from_error(err))
  }

  /// Message the caller may see, if this failure carries a safe one
  pub fn public_message(&self) -> Option<String> {
    match self {
      | Failure::Typed(e) => Some(e.message.clone()),
      | Failure::Message(m) => Some(m.clone()),
      | Failure::Cloud(c) => Some(c.message.clone()),
      | Failure::Fault(_) => None,
      | Failure::Other(v) => Some(render(v)),
    }
  }

  /// Normalize a job body's failure.
  ///
  /// Job runs are only observable to master-key holders through the status
  /// store, so faults keep their short message.
  pub fn into_job_error(self) -> Error {
    match self {
      | Failure::Typed(e) => e,
      | Failure::Message(m) => Error::script_failed(m),
      | Failure::Cloud(c) => Error::script_failed(c.message),
      | Failure::Fault(f) => Error::script_failed(f.message),
      | Failure::Other(v) => Error::script_failed(render(&v)),
    }
  }
}

/// Strings render bare, everything else as JSON text
pub(crate) fn render(v: &serde_json::Value) -> String {
  match v {
    | serde_json::Value::String(s) => s.clone(),
    | other => other.to_string(),
  }
}

impl From<Error> for Failure {
  fn from(e: Error) -> Self {
    Failure::Typed(e)
  }
}

impl From<CloudError> for Failure {
  fn from(e: CloudError) -> Self {
    Failure::Cloud(e)
  }
}

impl From<Fault> for Failure {
  fn from(f: Fault) -> Self {
    Failure::Fault(f)
  }
}

impl From<String> for Failure {
  fn from(m: String) -> Self {
    Failure::Message(m)
  }
}

impl From<&str> for Failure {
  fn from(m: &str) -> Self {
    Failure::Message(m.to_string())
  }
}

impl From<serde_json::Value> for Failure {
  fn from(v: serde_json::Value) -> Self {
    Failure::Other(v)
  }
}
