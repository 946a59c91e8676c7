use std::{future::Future,
          panic::{catch_unwind, AssertUnwindSafe},
          pin::Pin,
          sync::Arc,
          task::{Context, Poll}};

use serde_json::json;

use crate::{error::{Error, Failure, Fault},
            hooks,
            params,
            registry::{BoxFuture, Outcome, Validator},
            request::{Caller, Request},
            respond::{Reply, Responder},
            State};

/// Message used when a validator rejects without saying why
pub const VALIDATION_FAILED: &str = "Validation failed.";

/// A cloud function call as received from the transport
#[derive(Clone, Debug, Default)]
pub struct Call {
  /// Tenant the function is registered under
  pub app_id: String,
  /// Function name
  pub name: String,
  /// Body parameters (win over query parameters)
  pub body: serde_json::Map<String, serde_json::Value>,
  /// Query parameters
  pub query: serde_json::Map<String, serde_json::Value>,
  /// Caller context
  pub caller: Caller,
}

/// Resolve a function and prepare its invocation.
///
/// An unknown name fails here, before any async work. The returned future
/// validates, runs the function, and settles exactly once.
pub fn call(state: &Arc<State>, call: Call) -> Result<impl Future<Output = Result<Reply, Error>> + Send + 'static, Error> {
  let function = state.registry
                      .resolve_function(&call.name, &call.app_id)
                      .ok_or_else(|| Error::script_failed(format!("Invalid function: \"{}\"", call.name)))?;
  let validator = state.registry.resolve_validator(&call.name, &call.app_id);

  let request = Arc::new(Request { params: params::from_request(call.body, call.query),
                                   caller: call.caller,
                                   name: call.name });
  let state = state.clone();

  Ok(async move {
    let outcome = match validate(&state, validator, request.clone()).await {
      | Ok(()) => {
        let request = request.clone();
        guarded(move || function(request)).await
      },
      | Err(e) => Err(Failure::Typed(e)),
    };

    settle(&state, &request, outcome)
  })
}

/// Resolve and run a function to completion
pub async fn run(state: &Arc<State>, call: Call) -> Result<Reply, Error> {
  self::call(state, call)?.await
}

async fn validate(state: &State, validator: Option<Validator>, request: Arc<Request>) -> Result<(), Error> {
  let validator = match validator {
    | Some(v) => v,
    | None => return Ok(()),
  };

  let name = request.name.clone();
  let caller = request.caller.identity().map(String::from);

  match guarded(move || validator(request)).await {
    | Ok(true) => Ok(()),
    | Ok(false) => Err(Error::validation_failed(VALIDATION_FAILED)),
    | Err(Failure::Fault(fault)) => {
      log::error!("validator for {} faulted: {}", name, fault.trace);
      hooks::notify("internal_fault", || state.hooks.internal_fault(&fault.trace, caller.as_deref()));
      Err(Error::validation_failed(VALIDATION_FAILED))
    },
    | Err(failure) => {
      let message = failure.public_message()
                           .filter(|m| !m.is_empty())
                           .unwrap_or_else(|| VALIDATION_FAILED.into());
      Err(Error::validation_failed(message))
    },
  }
}

/// Start a callable and drive it, turning a panic at any point into a fault
async fn guarded<T>(start: impl FnOnce() -> BoxFuture<Result<T, Failure>>) -> Result<T, Failure> {
  match catch_unwind(AssertUnwindSafe(start)) {
    | Ok(fut) => Guarded(fut).await,
    | Err(panic) => Err(Failure::Fault(Fault::from_panic(panic))),
  }
}

struct Guarded<F>(F);

impl<T, F> Future for Guarded<F> where F: Future<Output = Result<T, Failure>> + Unpin
{
  type Output = Result<T, Failure>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let inner = &mut self.0;

    match catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
      | Ok(poll) => poll,
      | Err(panic) => Poll::Ready(Err(Failure::Fault(Fault::from_panic(panic)))),
    }
  }
}

fn settle(state: &State, request: &Request, outcome: Outcome) -> Result<Reply, Error> {
  let name = request.name.as_str();
  let user = request.caller.identity();
  let user_str = user.unwrap_or("<anonymous>");
  let params = serde_json::to_value(&request.params).unwrap_or_default();
  let input = state.audit.truncate(&params.to_string());

  let on_success = |reply: Reply| -> Result<Reply, Error> {
    let result = state.audit.truncate(&reply.response.result.to_string());
    state.audit.info(&format!("Ran cloud function {} for user {} with:\n  Input: {}\n  Result: {}",
                              name, user_str, input, result),
                     json!({ "functionName": name, "params": params, "user": user }));
    Ok(reply)
  };

  let on_error = |error: Error| -> Result<Reply, Error> {
    let serialized = serde_json::to_value(&error).unwrap_or_default();
    state.audit.error(&format!("Failed running cloud function {} for user {} with:\n  Input: {}\n  Error: {}",
                               name, user_str, input, serialized),
                      json!({ "functionName": name, "error": serialized, "params": params, "user": user }));

    hooks::notify("function_failed", || state.hooks.function_failed(name, &request.params, &error, user));
    Err(error)
  };

  Responder::new(state, user, on_success, on_error).settle(outcome)
}
