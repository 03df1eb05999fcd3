use tracing::{error, info};

/// Fire-and-forget progress sink the engine reports into while a
/// reconciliation runs. Owned by the caller (a UI, the CLI, a test); the
/// engine only ever calls it.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, steps: &[&str], current: usize, total: usize, error: Option<&str>);
}

/// Writes progress to the log.
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, steps: &[&str], current: usize, total: usize, error: Option<&str>) {
        let step = steps.get(current).copied().unwrap_or("done");
        match error {
            Some(message) => error!("Reconciliation failed at '{}': {}", step, message),
            None => info!("Reconciliation {}/{}: {}", current + 1, total, step),
        }
    }
}

/// Swallows progress, for callers that do not care.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _steps: &[&str], _current: usize, _total: usize, _error: Option<&str>) {}
}
