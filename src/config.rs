use std::{env, fmt};

/// Env var holding the message shown in place of internal fault detail
pub const CRASH_MESSAGE_VAR: &str = "CLOUDFN_CRASH_MESSAGE";

/// Env var holding the audit log truncation length
pub const LOG_TRUNCATION_VAR: &str = "CLOUDFN_LOG_TRUNCATION";

/// Default message shown in place of internal fault detail
pub const DEFAULT_CRASH_MESSAGE: &str = "Something went wrong. Please try again or contact support.";

/// Default audit log truncation length
pub const DEFAULT_LOG_TRUNCATION: usize = 500;

/// Runtime configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
  /// Message callers see when a callable hits an internal fault
  pub crash_message: String,
  /// Characters of input / result kept in audit entries
  pub log_truncation: usize,
}

/// Configuration errors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
  /// Truncation length was not a non-negative integer
  InvalidTruncation(String),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Error::InvalidTruncation(raw) => write!(f, "{} must be a non-negative integer, got {:?}", LOG_TRUNCATION_VAR, raw),
    }
  }
}

impl std::error::Error for Error {}

impl Default for Config {
  fn default() -> Self {
    Self { crash_message: DEFAULT_CRASH_MESSAGE.into(),
           log_truncation: DEFAULT_LOG_TRUNCATION }
  }
}

impl Config {
  /// Read configuration from the environment, loading `.env` first if one exists
  pub fn from_env() -> Result<Self, Error> {
    dotenv::dotenv().ok();

    let crash_message = env::var(CRASH_MESSAGE_VAR).unwrap_or_else(|_| DEFAULT_CRASH_MESSAGE.into());

    let log_truncation = match env::var(LOG_TRUNCATION_VAR) {
      | Ok(raw) => match raw.trim().parse::<usize>() {
        | Ok(n) => n,
        | Err(_) => return Err(Error::InvalidTruncation(raw)),
      },
      | Err(_) => DEFAULT_LOG_TRUNCATION,
    };

    Ok(Self { crash_message,
              log_truncation })
  }
}
