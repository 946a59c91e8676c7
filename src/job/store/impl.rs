use std::{collections::HashMap, sync::Mutex};

use chrono::Utc;

use super::*;
use crate::extra::Open;

/// In-memory job status store data.
///
/// Not persisted across instances of the application.
#[derive(Debug, Default)]
pub struct StoreData {
  /// Runs by id
  pub records: HashMap<Id, Record>,
}

impl StoreData {
  /// Create an empty store
  pub fn new() -> Self {
    Self::default()
  }

  fn finish(&mut self, job_id: &Id, state: States) -> Option<Id> {
    let record = self.records.get_mut(job_id).filter(|r| !r.state.is_terminal())?;

    record.state = state;
    record.finished_at = Some(Utc::now());

    Some(job_id.clone())
  }
}

impl Store for Mutex<StoreData> {
  fn running(&self, job_name: &str, params: &Params) -> Result<Id, Error> {
    let id = Id::new();
    let record = Record { id: id.clone(),
                          job_name: job_name.to_string(),
                          params: serde_json::to_value(params).unwrap_or_default(),
                          message: None,
                          messages: Vec::new(),
                          state: States::Running,
                          created_at: Utc::now(),
                          finished_at: None };

    self.open().records.insert(id.clone(), record);

    Ok(id)
  }

  fn succeeded(&self, job_id: &Id, result: serde_json::Value) -> Option<Id> {
    self.open().finish(job_id, States::Succeeded { result })
  }

  fn failed(&self, job_id: &Id, error: Error) -> Option<Id> {
    self.open().finish(job_id, States::Failed { error })
  }

  fn message(&self, job_id: &Id, text: &str) -> Option<Id> {
    let mut store = self.open();
    let record = store.records.get_mut(job_id).filter(|r| !r.state.is_terminal())?;

    record.message = Some(text.to_string());
    record.messages.push(text.to_string());

    Some(job_id.clone())
  }

  fn get(&self, job_id: &Id) -> Option<Record> {
    self.open().records.get(job_id).cloned()
  }

  fn get_all(&self) -> Vec<Record> {
    self.open().records.values().cloned().collect()
  }
}
