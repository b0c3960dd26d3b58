use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{Result, SubweaveError};

pub fn log_level(config: &LoggingConfig) -> Level {
    if config.verbose { Level::DEBUG } else { Level::INFO }
}

/// Install the global tracing subscriber
///
/// Console output always; a daily rolling file under `log_dir` when one is
/// configured. The returned guard flushes the file writer on drop and must be
/// held by the caller for as long as logging is wanted.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = log_level(config);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = rolling::daily(log_dir, &config.file_name);
            let (writer, guard) = non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SubweaveError::Logging(format!("Failed to initialize logging: {}", e)))?;

    match &config.log_dir {
        Some(log_dir) => info!(
            "Logging initialized - console: {}, file: {}",
            level,
            log_dir.join(&config.file_name).display()
        ),
        None => info!("Logging initialized - console: {}", level),
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        let mut config = LoggingConfig::default();
        assert_eq!(log_level(&config), Level::INFO);
        config.verbose = true;
        assert_eq!(log_level(&config), Level::DEBUG);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            verbose: true,
            log_dir: Some(dir.path().join("log")),
            file_name: "test.log".to_string(),
        };

        // Only one global subscriber can exist per process
        let _first = init_logging(&config);
        let second = init_logging(&config);
        assert!(matches!(second, Err(SubweaveError::Logging(_))));
        assert!(dir.path().join("log").exists());
    }
}
