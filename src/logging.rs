//! Logging infrastructure built on the `tracing` crate.
//!
//! Verbosity comes from a closed set of levels, selected through the
//! `EAGERTS_LOG` environment variable. Output goes to stderr through a
//! non-blocking writer; the returned guard must stay alive for logs to
//! flush.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable selecting the log level.
pub const ENV_LOG: &str = "EAGERTS_LOG";

/// Operator-facing verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// No output at all.
    Silent,
    /// Fatal problems only (default).
    Error,
    /// Recoverable problems: skipped eager pass, compiler warnings.
    Warning,
    /// Progress detail, including the resolved project file list.
    Info,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Error
    }
}

impl LogLevel {
    /// Parse a level name; unknown names map to the default.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "silent" => LogLevel::Silent,
            "error" => LogLevel::Error,
            "warning" => LogLevel::Warning,
            "info" => LogLevel::Info,
            _ => LogLevel::default(),
        }
    }

    /// Read the level from `EAGERTS_LOG`, defaulting to `error`.
    pub fn from_env() -> Self {
        match std::env::var(ENV_LOG) {
            Ok(value) => Self::parse(&value),
            Err(_) => LogLevel::default(),
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "eagerts=off",
            LogLevel::Error => "eagerts=error",
            LogLevel::Warning => "eagerts=warn",
            LogLevel::Info => "eagerts=info",
        }
    }
}

/// Initialize the global subscriber for this process.
///
/// Idempotent: if a subscriber is already installed this is a no-op and
/// returns `None`. Otherwise the returned `WorkerGuard` must be kept alive
/// for the duration of the program.
pub fn init(level: LogLevel) -> Option<WorkerGuard> {
    let filter = EnvFilter::new(level.directive());
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .compact()
        .with_filter(filter);

    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
