use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{error::Error, params::Params};

/// Hook result. A hook failing never changes the outcome it was told about.
pub type Result = core::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Side notifications fired when invocations go wrong.
///
/// Every method defaults to a no-op.
pub trait Hooks: 'static + Send + Sync + std::fmt::Debug {
  /// An unexpected internal fault escaped a callable
  fn internal_fault(&self, _trace: &str, _caller: Option<&str>) -> Result {
    Ok(())
  }

  /// A cloud function settled with an error
  fn function_failed(&self, _name: &str, _params: &Params, _error: &Error, _caller: Option<&str>) -> Result {
    Ok(())
  }

  /// A job body failed; `error` is the serialized typed error
  fn job_failed(&self, _name: &str, _params: &Params, _error: &str) -> Result {
    Ok(())
  }
}

/// Hooks that do nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}

/// Run a hook, logging and discarding its failure or panic
pub fn notify(hook: &str, f: impl FnOnce() -> Result) {
  match catch_unwind(AssertUnwindSafe(f)) {
    | Ok(Ok(())) => (),
    | Ok(Err(e)) => log::error!("{} hook failed: {}", hook, e),
    | Err(panic) => log::error!("{} hook panicked: {}", hook, crate::error::Fault::from_panic(panic).message),
  }
}
