use anyhow::Result;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable
const DEFAULT_FILTER: &str = "info,pdf_qa=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT=json` selects structured output; anything else is pretty.
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber: stderr plus a daily file under `logs/`.
///
/// Stdout is left alone so the final answer can be piped. Keep the returned
/// guard alive until exit or buffered file lines are lost.
pub fn init_logger() -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pdf-qa")
        .filename_suffix("log")
        .build("logs")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_thread_ids(true))
                .with(fmt::layer().json().with_writer(file_writer).with_thread_ids(true))
                .try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .try_init()?;
        }
    }

    Ok(guard)
}
