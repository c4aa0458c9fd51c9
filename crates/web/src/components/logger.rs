use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, info, warn};

/// Severity of a message sent to a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Application logger the server reports to.
#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    fn critical(&self, message: &str);

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => self.debug(message),
            LogLevel::Info => self.info(message),
            LogLevel::Warning => self.warning(message),
            LogLevel::Error => self.error(message),
            LogLevel::Critical => self.critical(message),
        }
    }
}

/// The default [`Logger`], forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        debug!("{message}");
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warning(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn critical(&self, message: &str) {
        error!(critical = true, "{message}");
    }
}

/// Logs through `logger`, swallowing a panic raised by it.
pub(crate) fn log_guarded(logger: &dyn Logger, level: LogLevel, message: &str) {
    if catch_unwind(AssertUnwindSafe(|| logger.log(level, message))).is_err() {
        warn!(%level, "application logger panicked, message dropped");
    }
}
