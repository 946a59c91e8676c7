use chrono::{DateTime, Utc};
use serde::{Deserialize as De, Serialize as Ser};

use crate::{error::Error, params::Params};

mod r#impl;
pub use r#impl::StoreData;

/// Job status record ID
#[derive(Debug, Hash, PartialOrd, PartialEq, Eq, Clone, Ser, De)]
pub struct Id(String);

impl Default for Id {
  fn default() -> Self {
    Self::new()
  }
}

impl Id {
  /// Generate a fresh id
  pub fn new() -> Self {
    Self(nanoid::nanoid!())
  }
}

impl From<String> for Id {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<&str> for Id {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl std::ops::Deref for Id {
  type Target = String;

  fn deref(&self) -> &String {
    &self.0
  }
}

impl std::fmt::Display for Id {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// State a job run may be in
#[derive(Debug, Clone, PartialEq, Ser)]
#[serde(tag = "status")]
pub enum States {
  /// Body started or about to start
  #[serde(rename = "running")]
  Running,
  /// Body returned a value
  #[serde(rename = "succeeded")]
  Succeeded {
    /// Encoded result
    result: serde_json::Value,
  },
  /// Body failed
  #[serde(rename = "failed")]
  Failed {
    /// Normalized error
    error: Error,
  },
}

impl States {
  /// Whether the run has finished
  pub fn is_terminal(&self) -> bool {
    !matches!(self, States::Running)
  }
}

/// One job run
#[derive(Debug, Clone, PartialEq, Ser)]
#[serde(rename_all = "camelCase")]
pub struct Record {
  /// Unique identifier
  pub id: Id,
  /// Name of the job that ran
  pub job_name: String,
  /// Parameters in wire form
  pub params: serde_json::Value,
  /// Latest progress message
  pub message: Option<String>,
  /// Every progress message, oldest first
  pub messages: Vec<String>,
  /// Current state
  #[serde(flatten)]
  pub state: States,
  /// When the run was recorded
  pub created_at: DateTime<Utc>,
  /// When the run reached a terminal state
  pub finished_at: Option<DateTime<Utc>>,
}

/// Job status store & state machine.
///
/// `succeeded` / `failed` only move a `Running` record; they yield `None`
/// for unknown or already finished ids, so a run is settled at most once.
pub trait Store: 'static + Send + Sync + std::fmt::Debug {
  /// Record a new run in `Running` state, returning its id
  fn running(&self, job_name: &str, params: &Params) -> Result<Id, Error>;

  /// Mark a run as succeeded
  fn succeeded(&self, job_id: &Id, result: serde_json::Value) -> Option<Id>;

  /// Mark a run as failed
  fn failed(&self, job_id: &Id, error: Error) -> Option<Id>;

  /// Append a progress message to a running job
  fn message(&self, job_id: &Id, text: &str) -> Option<Id>;

  /// Get a run
  fn get(&self, job_id: &Id) -> Option<Record>;

  /// Get all runs
  fn get_all(&self) -> Vec<Record>;

  /// Get all runs still in `Running` state
  fn get_all_running(&self) -> Vec<Record> {
    self.get_all()
        .into_iter()
        .filter(|r| !r.state.is_terminal())
        .collect()
  }
}
