/// Suffix appended to truncated log text
pub const TRUNCATED: &str = "... (truncated)";

/// Audit log sink for invocation outcomes
pub trait Audit: 'static + Send + Sync + std::fmt::Debug {
  /// Record a successful outcome
  fn info(&self, message: &str, fields: serde_json::Value);

  /// Record a failed outcome
  fn error(&self, message: &str, fields: serde_json::Value);

  /// Shorten text destined for the log
  fn truncate(&self, text: &str) -> String;
}

/// Writes audit entries through the `log` facade
#[derive(Clone, Copy, Debug)]
pub struct LogAudit {
  /// Maximum number of characters kept by `truncate`
  pub truncation: usize,
}

impl LogAudit {
  /// Create a new instance
  pub fn new(truncation: usize) -> Self {
    Self { truncation }
  }
}

impl Audit for LogAudit {
  fn info(&self, message: &str, fields: serde_json::Value) {
    log::info!("{} {}", message, fields);
  }

  fn error(&self, message: &str, fields: serde_json::Value) {
    log::error!("{} {}", message, fields);
  }

  fn truncate(&self, text: &str) -> String {
    match text.char_indices().nth(self.truncation) {
      | Some((end, _)) => format!("{}{}", &text[..end], TRUNCATED),
      | None => text.to_string(),
    }
  }
}
