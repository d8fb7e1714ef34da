use crate::config::LogConfig;
use crate::KanbanResult;
use tracing_subscriber::EnvFilter;

/// Environment variable naming a file that receives a full debug log.
pub const DEBUG_LOG_ENV: &str = "KANBAN_DEBUG_LOG";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When
/// `KANBAN_DEBUG_LOG` is set, everything at debug level and above is
/// appended to that file instead of stderr.
pub fn init_logging(config: &LogConfig) -> KanbanResult<()> {
    if let Ok(log_path) = std::env::var(DEBUG_LOG_ENV) {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        // try_init: a subscriber may already be installed by a test harness
        let _ = tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter(&config.level))
            .try_init();
    }

    Ok(())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}
