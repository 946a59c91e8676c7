use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize as Ser;
use tokio::runtime::Handle;

pub mod store;
pub use store::Store;

use crate::{error::{Error, Failure, Fault},
            hooks,
            params::{self, Params},
            registry,
            registry::Outcome,
            request::{JobRequest, Messenger},
            State};

/// Header carrying the status record id of a submitted job
pub const STATUS_HEADER: &str = "X-Parse-Job-Status-Id";

/// A job submission as received from the transport
#[derive(Clone, Debug, Default)]
pub struct Call {
  /// Tenant the job is registered under
  pub app_id: String,
  /// Job name from the request path; wins over the body's `jobName`
  pub name: Option<String>,
  /// Body parameters (win over query parameters)
  pub body: serde_json::Map<String, serde_json::Value>,
  /// Query parameters
  pub query: serde_json::Map<String, serde_json::Value>,
  /// Headers of the triggering request
  pub headers: BTreeMap<String, String>,
  /// Address of the triggering request
  pub ip: Option<String>,
}

impl Call {
  /// Path name, falling back to the body's `jobName` when absent or empty
  pub fn job_name(&self) -> Option<String> {
    self.name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| self.body.get("jobName").and_then(|v| v.as_str()).map(String::from))
  }
}

/// Immediate answer to a job submission; carries no outcome
#[derive(Clone, Debug, PartialEq, Ser)]
pub struct Ack {
  /// Response headers, including [`STATUS_HEADER`]
  pub headers: BTreeMap<String, String>,
  /// Always empty
  pub response: serde_json::Map<String, serde_json::Value>,
}

impl Ack {
  fn new(job_id: &store::Id) -> Self {
    let mut headers = BTreeMap::new();
    headers.insert(STATUS_HEADER.to_string(), job_id.to_string());

    Self { headers,
           response: serde_json::Map::new() }
  }

  /// Status record id this acknowledgment correlates to
  pub fn job_id(&self) -> Option<store::Id> {
    self.headers.get(STATUS_HEADER).map(|id| store::Id::from(id.as_str()))
  }
}

/// Submit a job.
///
/// Resolves the job, records it as running, schedules the body on the
/// current tokio runtime and returns without waiting for it. The outcome
/// is only observable through the status store.
pub fn submit(state: &Arc<State>, call: Call) -> Result<Ack, Error> {
  let invalid = || Error::script_failed("Invalid job.");

  let name = call.job_name().ok_or_else(invalid)?;
  let body = state.registry.resolve_job(&name, &call.app_id).ok_or_else(invalid)?;

  let runtime = Handle::try_current().map_err(|e| {
                                       log::error!("job {}: no runtime to run on: {}", name, e);
                                       Error::script_failed(&state.config.crash_message)
                                     })?;

  let params = params::from_request(call.body, call.query);
  let job_id = state.jobs.running(&name, &params)?;
  log::info!("job {:?}: {} running", job_id, name);

  let request = JobRequest { params: params.clone(),
                             log: state.audit.clone(),
                             headers: call.headers,
                             ip: call.ip,
                             job_name: name.clone(),
                             job_id: job_id.clone(),
                             messenger: Messenger::new(job_id.clone(), state.jobs.clone()) };

  let run = Run { state: state.clone(),
                  job_id: job_id.clone(),
                  name,
                  params };

  runtime.spawn(run.exec(body, request));

  Ok(Ack::new(&job_id))
}

/// A detached job execution
struct Run {
  state: Arc<State>,
  job_id: store::Id,
  name: String,
  params: Params,
}

impl Run {
  async fn exec(self, body: registry::Job, request: JobRequest) {
    log::info!("job {:?}: working", self.job_id);

    let outcome = match tokio::spawn(async move { body(request).await }).await {
      | Ok(outcome) => outcome,
      | Err(e) if e.is_panic() => Err(Failure::Fault(Fault::from_panic(e.into_panic()))),
      | Err(e) => Err(Failure::fault(&e)),
    };

    self.settle(outcome);
  }

  fn settle(self, outcome: Outcome) {
    let Run { state,
              job_id,
              name,
              params } = self;

    match outcome {
      | Ok(result) => {
        let result = state.encoder.encode(&result);

        match state.jobs.succeeded(&job_id, result) {
          | Some(_) => log::info!("job {:?}: succeeded", job_id),
          | None => log::error!("job {:?}: finished but was no longer running", job_id),
        }
      },
      | Err(failure) => {
        let error = failure.into_job_error();
        let serialized = serde_json::to_string(&error).unwrap_or_else(|_| error.message.clone());

        match state.jobs.failed(&job_id, error) {
          | Some(_) => log::error!("job {:?}: failed: {}", job_id, serialized),
          | None => log::error!("job {:?}: failed but was no longer running: {}", job_id, serialized),
        }

        hooks::notify("job_failed", || state.hooks.job_failed(&name, &params, &serialized));
      },
    }
  }
}
