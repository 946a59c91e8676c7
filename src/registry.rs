use std::{collections::HashMap,
          future::Future,
          pin::Pin,
          sync::{Arc, Mutex}};

use crate::{error::Failure,
            extra::Open,
            request::{JobRequest, Request},
            value::Value};

/// A boxed, sendable future
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What a function or job body settles with
pub type Outcome = Result<Value, Failure>;

/// A cloud function
pub type Function = Arc<dyn Fn(Arc<Request>) -> BoxFuture<Outcome> + Send + Sync>;

/// Checks a request before its function runs. `Ok(false)` rejects.
pub type Validator = Arc<dyn Fn(Arc<Request>) -> BoxFuture<Result<bool, Failure>> + Send + Sync>;

/// A background job body
pub type Job = Arc<dyn Fn(JobRequest) -> BoxFuture<Outcome> + Send + Sync>;

/// Wrap an async closure as a [`Function`]
pub fn function<F, Fut>(f: F) -> Function
  where F: Fn(Arc<Request>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static
{
  Arc::new(move |req: Arc<Request>| Box::pin(f(req)) as BoxFuture<Outcome>)
}

/// Wrap an async closure as a [`Validator`]
pub fn validator<F, Fut>(f: F) -> Validator
  where F: Fn(Arc<Request>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, Failure>> + Send + 'static
{
  Arc::new(move |req: Arc<Request>| Box::pin(f(req)) as BoxFuture<Result<bool, Failure>>)
}

/// Wrap an async closure as a [`Job`]
pub fn job<F, Fut>(f: F) -> Job
  where F: Fn(JobRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static
{
  Arc::new(move |req: JobRequest| Box::pin(f(req)) as BoxFuture<Outcome>)
}

/// Resolves callables by name, scoped to a tenant (`app_id`)
pub trait Registry: 'static + Send + Sync + std::fmt::Debug {
  /// Find a cloud function
  fn resolve_function(&self, name: &str, app_id: &str) -> Option<Function>;

  /// Find a job
  fn resolve_job(&self, name: &str, app_id: &str) -> Option<Job>;

  /// Find the validator attached to a function, if any
  fn resolve_validator(&self, name: &str, app_id: &str) -> Option<Validator>;
}

type Key = (String, String);

fn key(name: &str, app_id: &str) -> Key {
  (app_id.to_string(), name.to_string())
}

/// Registered callables
#[derive(Default)]
pub struct Callables {
  functions: HashMap<Key, Function>,
  jobs: HashMap<Key, Job>,
  validators: HashMap<Key, Validator>,
}

impl std::fmt::Debug for Callables {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Callables")
     .field("functions", &self.functions.keys().collect::<Vec<_>>())
     .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
     .field("validators", &self.validators.keys().collect::<Vec<_>>())
     .finish()
  }
}

/// In-memory registry
#[derive(Clone, Debug, Default)]
pub struct MemRegistry(Arc<Mutex<Callables>>);

impl MemRegistry {
  /// Create an empty registry
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a function for a tenant, replacing any previous one with that name
  pub fn register_function(&self, app_id: &str, name: &str, f: Function) {
    self.0.open().functions.insert(key(name, app_id), f);
  }

  /// Register a job for a tenant
  pub fn register_job(&self, app_id: &str, name: &str, f: Job) {
    self.0.open().jobs.insert(key(name, app_id), f);
  }

  /// Attach a validator to a function name for a tenant
  pub fn register_validator(&self, app_id: &str, name: &str, f: Validator) {
    self.0.open().validators.insert(key(name, app_id), f);
  }
}

impl Registry for MemRegistry {
  fn resolve_function(&self, name: &str, app_id: &str) -> Option<Function> {
    self.0.open().functions.get(&key(name, app_id)).cloned()
  }

  fn resolve_job(&self, name: &str, app_id: &str) -> Option<Job> {
    self.0.open().jobs.get(&key(name, app_id)).cloned()
  }

  fn resolve_validator(&self, name: &str, app_id: &str) -> Option<Validator> {
    self.0.open().validators.get(&key(name, app_id)).cloned()
  }
}
