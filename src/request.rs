use std::{collections::BTreeMap, sync::Arc};

use crate::{audit::Audit, job::store, params::Params};

/// Who is calling, passed through to callables unexamined
#[derive(Clone, Debug, Default)]
pub struct Caller {
  /// Id of the authenticated user, if any
  pub user: Option<String>,
  /// Whether the request was made with the master key
  pub master: bool,
  /// Installation the request came from
  pub installation_id: Option<String>,
  /// Request headers
  pub headers: BTreeMap<String, String>,
  /// Remote address
  pub ip: Option<String>,
  /// Free-form context supplied by the client
  pub context: serde_json::Map<String, serde_json::Value>,
}

impl Caller {
  /// Identity string used in logs and hooks
  pub fn identity(&self) -> Option<&str> {
    self.user.as_deref()
  }
}

/// A single cloud function invocation, shared by the validator and the function
#[derive(Clone, Debug)]
pub struct Request {
  /// Decoded parameters
  pub params: Params,
  /// Caller context
  pub caller: Caller,
  /// Registered name of the function
  pub name: String,
}

/// Appends progress text to a running job's status record
#[derive(Clone, Debug)]
pub struct Messenger {
  id: store::Id,
  jobs: Arc<dyn store::Store>,
}

impl Messenger {
  /// Create a messenger for job `id`
  pub fn new(id: store::Id, jobs: Arc<dyn store::Store>) -> Self {
    Self { id, jobs }
  }

  /// Report progress
  pub fn message(&self, text: impl AsRef<str>) {
    if self.jobs.message(&self.id, text.as_ref()).is_none() {
      log::debug!("job {:?}: progress message dropped, job not running", self.id);
    }
  }
}

/// Context handed to a job body
#[derive(Clone, Debug)]
pub struct JobRequest {
  /// Decoded parameters
  pub params: Params,
  /// Audit log handle
  pub log: Arc<dyn Audit>,
  /// Headers of the triggering request
  pub headers: BTreeMap<String, String>,
  /// Address of the triggering request
  pub ip: Option<String>,
  /// Registered name of the job
  pub job_name: String,
  /// Status record of this run
  pub job_id: store::Id,
  /// Progress sink wired to the status record
  pub messenger: Messenger,
}

impl JobRequest {
  /// Report progress on this run
  pub fn message(&self, text: impl AsRef<str>) {
    self.messenger.message(text)
  }
}
