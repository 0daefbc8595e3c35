//! Logging service

use crate::models::{LogLevel, TaskKind};
use tracing_subscriber::EnvFilter;

/// Default filter directive for `level`, covering the CLI and the core library
pub fn default_filter(level: LogLevel) -> String {
    format!(
        "fastilybot={level},fastilybot_core={level}",
        level = level.as_str()
    )
}

/// Initialize logging with the specified level. `RUST_LOG` overrides the level when set.
pub fn init_logging(level: LogLevel, color: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Log the start of a task
pub fn log_task_start(kind: TaskKind, id: u32, name: &str) {
    tracing::info!(kind = %kind, id = id, task = name, "Starting task");
}

/// Log a task which completed without error
pub fn log_task_finished(kind: TaskKind, id: u32, name: &str, elapsed_secs: f64) {
    tracing::info!(
        kind = %kind,
        id = id,
        task = name,
        elapsed_secs = elapsed_secs,
        "Task finished"
    );
}

/// Log a failed task with its full error chain
pub fn log_task_failure(kind: TaskKind, id: u32, name: &str, error: &anyhow::Error) {
    tracing::error!(
        kind = %kind,
        id = id,
        task = name,
        error = format!("{:#}", error),
        "Task failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = init_logging(LogLevel::Info, false);
        });
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter(LogLevel::Warn),
            "fastilybot=warn,fastilybot_core=warn"
        );
    }

    #[test]
    fn test_second_initialization_is_an_error() {
        init_test_logging();
        assert!(init_logging(LogLevel::Debug, true).is_err());
    }

    #[test]
    fn test_log_functions() {
        init_test_logging();

        // These should not panic
        log_task_start(TaskKind::Bot, 1, "mtc_clerk");
        log_task_finished(TaskKind::Report, 2, "orphaned_files_for_discussion", 0.5);
        log_task_failure(
            TaskKind::Report,
            3,
            "all_free_license_tags",
            &anyhow::anyhow!("boom"),
        );
    }
}
