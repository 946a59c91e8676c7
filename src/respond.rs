use serde::Serialize as Ser;

use crate::{error::{render, Error, Failure},
            hooks,
            registry::Outcome,
            value::Value,
            State};

/// Successful function result as handed to the transport
#[derive(Clone, Debug, PartialEq, Ser)]
pub struct Reply {
  /// Response body
  pub response: Payload,
}

/// `{ "result": ... }`
#[derive(Clone, Debug, PartialEq, Ser)]
pub struct Payload {
  /// Encoded callable result
  pub result: serde_json::Value,
}

/// Paired success / error completion for one invocation.
///
/// Both channels consume the responder, so exactly one sink fires.
pub struct Responder<'a, S, E> {
  state: &'a State,
  caller: Option<&'a str>,
  on_success: S,
  on_error: E,
}

impl<'a, S, E> std::fmt::Debug for Responder<'a, S, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Responder")
     .field("caller", &self.caller)
     .field("on_success", &"FnOnce(Reply)")
     .field("on_error", &"FnOnce(Error)")
     .finish()
  }
}

impl<'a, S, E> Responder<'a, S, E> {
  /// Create a responder forwarding to the given sinks
  pub fn new(state: &'a State, caller: Option<&'a str>, on_success: S, on_error: E) -> Self {
    Self { state,
           caller,
           on_success,
           on_error }
  }

  /// Encode `raw` and forward `{ result }` to the success sink
  pub fn success<T>(self, raw: &Value) -> T
    where S: FnOnce(Reply) -> T
  {
    let result = self.state.encoder.encode(raw);
    (self.on_success)(Reply { response: Payload { result } })
  }

  /// Normalize `raw` into a typed error and forward it to the error sink
  pub fn error<T>(self, raw: Failure) -> T
    where E: FnOnce(Error) -> T
  {
    let error = normalize(self.state, self.caller, raw);
    (self.on_error)(error)
  }

  /// Route a callable's outcome to the matching channel
  pub fn settle<T>(self, outcome: Outcome) -> T
    where S: FnOnce(Reply) -> T,
          E: FnOnce(Error) -> T
  {
    match outcome {
      | Ok(value) => self.success(&value),
      | Err(failure) => self.error(failure),
    }
  }
}

/// Turn any failure into a typed error.
///
/// Internal faults are reported to the crash hook with full detail and
/// replaced by the configured generic message.
pub fn normalize(state: &State, caller: Option<&str>, raw: Failure) -> Error {
  match raw {
    | Failure::Typed(e) => e,
    | Failure::Message(m) => Error::script_failed(m),
    | Failure::Cloud(c) => Error::script_failed(c.message),
    | Failure::Fault(fault) => {
      log::error!("internal fault (user {}): {}", caller.unwrap_or("<anonymous>"), fault.trace);
      hooks::notify("internal_fault", || state.hooks.internal_fault(&fault.trace, caller));

      Error::script_failed(&state.config.crash_message)
    },
    | Failure::Other(v) => Error::script_failed(render(&v)),
  }
}
