use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use aniflix_core::config::LoggingConfig;

/// Pick the filter: `RUST_LOG` wins, then `-v`/`-vv`, then the config.
fn env_filter(config: &LoggingConfig, verbose: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directives = match verbose {
        0 => config.filter.as_str(),
        1 => "info,aniflix=debug,aniflix_core=debug,aniflix_api=debug,aniflix_runtime=debug",
        _ => "trace",
    };
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Logs go to stderr so `--json` output
/// stays clean; with `logging.file` they are also written to a daily file.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init(config: &LoggingConfig, verbose: u8, log_dir: &Path) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(env_filter(config, verbose));

    if !config.file {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        tracing_subscriber::registry().with(stderr_layer).init();
        tracing::warn!(dir = %log_dir.display(), error = %e, "Log directory unavailable, file logging disabled");
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "aniflix.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(env_filter(config, verbose));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Some(guard)
}

