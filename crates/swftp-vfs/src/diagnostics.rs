//! Operator-triggered runtime diagnostics.
//!
//! Nothing in the filesystem or transfer bridge depends on this module. A
//! binary opts in by spawning [`spawn_signal_listener`], after which
//! `SIGUSR1` or `SIGUSR2` logs a report.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Something that can describe the process on demand.
pub trait DiagnosticsHook: Send + Sync {
    fn report(&self) -> String;
}

/// Snapshot of the process and its tokio runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeReport {
    pub pid: u32,
    pub uptime: Duration,
    pub workers: usize,
    pub alive_tasks: usize,
}

impl fmt::Display for RuntimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid={} uptime={}s workers={} alive_tasks={}",
            self.pid,
            self.uptime.as_secs(),
            self.workers,
            self.alive_tasks
        )
    }
}

/// Snapshot the current runtime. Must be called from inside one.
pub fn runtime_report(started: Instant) -> RuntimeReport {
    let metrics = tokio::runtime::Handle::current().metrics();
    RuntimeReport {
        pid: std::process::id(),
        uptime: started.elapsed(),
        workers: metrics.num_workers(),
        alive_tasks: metrics.num_alive_tasks(),
    }
}

/// The default hook: a [`RuntimeReport`] since `started`.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeDiagnostics {
    started: Instant,
}

impl RuntimeDiagnostics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for RuntimeDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsHook for RuntimeDiagnostics {
    fn report(&self) -> String {
        runtime_report(self.started).to_string()
    }
}

/// Log `hook`'s report on every `SIGUSR1`/`SIGUSR2` until `cancel` fires.
#[cfg(unix)]
pub fn spawn_signal_listener(
    hook: Arc<dyn DiagnosticsHook>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let (mut usr1, mut usr2) = match (
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) {
            (Ok(usr1), Ok(usr2)) => (usr1, usr2),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "diagnostics signals unavailable");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(()) = usr1.recv() => tracing::info!(report = %hook.report(), "SIGUSR1"),
                Some(()) = usr2.recv() => tracing::info!(report = %hook.report(), "SIGUSR2"),
            }
        }
    })
}
