use std::fmt;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

use crate::request::UserId;

/// A request-scoped logger.
///
/// Obtained from [`Ctx::log`](crate::Ctx::log). Every event carries the
/// request id and, when known, the caller's account id. Password fields are
/// [`Secret`](crate::Secret)s and render as `[REDACTED]` if formatted here.
#[derive(Debug)]
pub struct RequestLog<'a> {
    request_id: &'a str,
    principal: Option<UserId>,
}

impl<'a> RequestLog<'a> {
    pub(crate) fn new(request_id: &'a str, principal: Option<UserId>) -> Self {
        Self {
            request_id,
            principal,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message.
    ///
    /// ```no_run
    /// # use account_policy::{RequestLog, Secret};
    /// # fn example(log: &RequestLog) {
    /// let password = Secret::new("booyah");
    /// log.info(format_args!("password changed: {}", password));
    /// # }
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, principal = ?self.principal, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, principal = ?self.principal, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, principal = ?self.principal, "{}", args);
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_directive` when set.
pub fn init(default_directive: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .try_init()
}
