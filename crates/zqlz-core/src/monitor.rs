//! Progress monitors
//!
//! A monitor is the caller's execution context: it answers whether the
//! caller has asked to stop and receives coarse status updates. Components
//! poll it at well-defined points (before starting work) and may race long
//! waits against its cancellation token; they never own it.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Caller-supplied execution context
pub trait ProgressMonitor: Send + Sync {
    /// Whether the caller has requested cancellation
    fn is_cancelled(&self) -> bool;

    /// Token that fires on cancellation, for racing in-flight I/O.
    ///
    /// Monitors that can never be cancelled return `None`.
    fn cancellation_token(&self) -> Option<CancellationToken> {
        None
    }

    /// Report the start of a named unit of work
    fn begin_task(&self, _name: &str) {}

    /// Report that the current unit of work finished
    fn done(&self) {}
}

/// Monitor for work nobody observes or cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct VoidProgressMonitor;

impl ProgressMonitor for VoidProgressMonitor {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellable monitor backed by a [`CancellationToken`].
///
/// Task names are recorded so the owner can show what is currently running
/// and emitted as tracing events.
#[derive(Debug, Default)]
pub struct TaskMonitor {
    token: CancellationToken,
    tasks: Mutex<Vec<String>>,
}

impl TaskMonitor {
    /// Create a monitor with a fresh token
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor that is cancelled together with `token`
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        tracing::debug!("task monitor cancelled");
        self.token.cancel();
    }

    /// Name of the innermost running task, if any
    pub fn current_task(&self) -> Option<String> {
        self.tasks.lock().last().cloned()
    }
}

impl ProgressMonitor for TaskMonitor {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancellation_token(&self) -> Option<CancellationToken> {
        Some(self.token.clone())
    }

    fn begin_task(&self, name: &str) {
        tracing::debug!(task = %name, "task started");
        self.tasks.lock().push(name.to_string());
    }

    fn done(&self) {
        if let Some(name) = self.tasks.lock().pop() {
            tracing::debug!(task = %name, "task finished");
        }
    }
}

/// A unit of work reported to a monitor while the value is alive.
///
/// `done` runs on drop, so work abandoned mid-await (a dropped future, a
/// timeout) still closes its task.
pub struct MonitorTask<'a> {
    monitor: &'a dyn ProgressMonitor,
}

impl<'a> MonitorTask<'a> {
    pub fn begin(monitor: &'a dyn ProgressMonitor, name: &str) -> Self {
        monitor.begin_task(name);
        Self { monitor }
    }
}

impl Drop for MonitorTask<'_> {
    fn drop(&mut self) {
        self.monitor.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_monitor_never_cancels() {
        let monitor = VoidProgressMonitor;
        assert!(!monitor.is_cancelled());
        assert!(monitor.cancellation_token().is_none());
    }

    #[test]
    fn test_task_monitor_tracks_nested_tasks() {
        let monitor = TaskMonitor::new();
        monitor.begin_task("Load partitions");
        monitor.begin_task("Read row count");
        assert_eq!(monitor.current_task().as_deref(), Some("Read row count"));
        monitor.done();
        assert_eq!(monitor.current_task().as_deref(), Some("Load partitions"));
        monitor.done();
        assert_eq!(monitor.current_task(), None);
    }

    #[test]
    fn test_monitor_task_closes_on_drop() {
        let monitor = TaskMonitor::new();
        {
            let _task = MonitorTask::begin(&monitor, "Load indexes");
            assert_eq!(monitor.current_task().as_deref(), Some("Load indexes"));
        }
        assert_eq!(monitor.current_task(), None);
    }

    #[test]
    fn test_task_monitor_cancel_fires_token() {
        let parent = CancellationToken::new();
        let monitor = TaskMonitor::with_token(parent.child_token());
        let token = monitor.cancellation_token().unwrap();
        assert!(!monitor.is_cancelled());
        parent.cancel();
        assert!(monitor.is_cancelled());
        assert!(token.is_cancelled());
    }
}
