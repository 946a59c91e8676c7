//! # cloudfn
//! Invocation and job-lifecycle core for tenant-scoped cloud code.
//!
//! Given a named callable registered for a tenant (`app_id`), this crate
//! decodes untyped wire parameters into richer values, runs the callable,
//! and settles it under a single success / error protocol. Jobs are run
//! detached from the request that submitted them, their progress tracked
//! in a status store.
//!
//! # Flow
//! - [`function::call`] resolves a function (and its validator), decodes
//!   params, validates, invokes, and settles through [`respond::Responder`].
//!   Every error leaving it is a typed [`error::Error`].
//! - [`job::submit`] resolves a job, records it as `running`, returns an
//!   [`job::Ack`] carrying the status id and runs the body on the tokio
//!   runtime. The body's outcome lands in the [`job::Store`] as `succeeded`
//!   or `failed`.
//!
//! Routing, authentication, and callable registration happen elsewhere;
//! the collaborators they provide are the traits in [`registry`], [`job::store`],
//! [`hooks`], [`audit`], and [`wire`].

#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]

use std::sync::Arc;

/// Runtime configuration
pub mod config;

/// Helper mutex functions
pub mod extra;

/// Decoded value tree
pub mod value;

/// Parameter decoding
pub mod params;

/// Typed errors & raw failures
pub mod error;

/// Result encoding
pub mod wire;

/// Audit logging
pub mod audit;

/// Failure hooks
pub mod hooks;

/// Callable registry
pub mod registry;

/// Invocation requests
pub mod request;

/// Success / error response protocol
pub mod respond;

/// Cloud function invocation
pub mod function;

/// Background jobs
pub mod job;

pub use config::Config;
pub use error::{CloudError, Error, Failure, Kind};
pub use value::Value;

/// Collaborators shared by function and job invocations
#[derive(Debug)]
pub struct State {
  /// Runtime configuration
  pub config: Config,
  /// Resolves callables
  pub registry: Arc<dyn registry::Registry>,
  /// Job status store
  pub jobs: Arc<dyn job::Store>,
  /// Failure hooks
  pub hooks: Arc<dyn hooks::Hooks>,
  /// Audit log
  pub audit: Arc<dyn audit::Audit>,
  /// Result encoder
  pub encoder: Arc<dyn wire::Encode>,
}

impl State {
  /// Create a new state with no-op hooks, `log`-backed auditing and JSON encoding
  pub fn new(config: Config, registry: Arc<dyn registry::Registry>, jobs: Arc<dyn job::Store>) -> Self {
    let audit = Arc::new(audit::LogAudit::new(config.log_truncation));

    Self { config,
           registry,
           jobs,
           hooks: Arc::new(hooks::NoHooks),
           audit,
           encoder: Arc::new(wire::Wire) }
  }

  /// Create a new state configured from the environment
  pub fn from_env(registry: Arc<dyn registry::Registry>, jobs: Arc<dyn job::Store>) -> Result<Self, config::Error> {
    Config::from_env().map(|config| Self::new(config, registry, jobs))
  }

  /// Replace the failure hooks
  pub fn with_hooks(mut self, hooks: Arc<dyn hooks::Hooks>) -> Self {
    self.hooks = hooks;
    self
  }

  /// Replace the audit log
  pub fn with_audit(mut self, audit: Arc<dyn audit::Audit>) -> Self {
    self.audit = audit;
    self
  }

  /// Replace the result encoder
  pub fn with_encoder(mut self, encoder: Arc<dyn wire::Encode>) -> Self {
    self.encoder = encoder;
    self
  }
}
