use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::{AppPaths, LoggingSettings};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const FALLBACK_DIRECTIVES: &str = "info";

/// Installs the global subscriber: a daily file under `logs/` plus stdout
/// unless `logging.stdout` is off. `RUST_LOG` wins over `logging.level`.
pub fn init(paths: &AppPaths, settings: &LoggingSettings) {
    let log_dir = &paths.log_dir;
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, settings.file_prefix.trim());
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| configured_filter(&settings.level));

    let stdout_layer = settings
        .stdout
        .then(|| tracing_subscriber::fmt::layer().with_target(false));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Logging already initialised: {}", err);
    }
}

fn configured_filter(level: &str) -> EnvFilter {
    let directives = filter_directives(level);
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("Invalid logging.level '{}': {}; using '{}'", directives, err, FALLBACK_DIRECTIVES);
        EnvFilter::new(FALLBACK_DIRECTIVES)
    })
}

fn filter_directives(level: &str) -> &str {
    let level = level.trim();
    if level.is_empty() {
        FALLBACK_DIRECTIVES
    } else {
        level
    }
}
