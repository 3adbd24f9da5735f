//! Supervision of the server's background work
//!
//! The order worker, the shop cache warmup and the log cleanup timer all run
//! under one [`BackgroundTasks`] so a panic is logged rather than lost and a
//! single cancellation stops every loop at shutdown.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Runs to completion once, e.g. cache warmup
    Warmup,
    /// Loops until cancelled, e.g. the order worker
    Worker,
    /// Timer-driven housekeeping
    Periodic,
}

impl TaskKind {
    fn as_str(self) -> &'static str {
        match self {
            TaskKind::Warmup => "warmup",
            TaskKind::Worker => "worker",
            TaskKind::Periodic => "periodic",
        }
    }

    /// Finishing before shutdown means something went wrong
    fn runs_until_shutdown(self) -> bool {
        self != TaskKind::Warmup
    }
}

struct Supervised {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<Supervised>,
    shutdown: CancellationToken,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancelled when [`BackgroundTasks::shutdown`] starts
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if kind.runs_until_shutdown() && !shutdown.is_cancelled() => {
                    tracing::warn!(task = name, kind = kind.as_str(), "Background task exited early");
                }
                Ok(()) => {}
                Err(payload) => {
                    tracing::error!(
                        task = name,
                        kind = kind.as_str(),
                        panic = panic_message(payload.as_ref()),
                        "Background task panicked"
                    );
                }
            }
        });
        tracing::debug!(task = name, kind = kind.as_str(), "Background task started");
        self.tasks.push(Supervised { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<_> = self.tasks.iter().map(|t| t.name).collect();
        tracing::info!(count = names.len(), tasks = ?names, "Background tasks running");
    }

    /// Long-lived tasks that have already stopped
    pub fn stopped_tasks(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|t| t.kind.runs_until_shutdown() && t.handle.is_finished())
            .map(|t| t.name)
            .collect()
    }

    /// Cancel every task, then wait for them all to finish within `timeout`.
    /// Whatever is still running at the deadline is aborted.
    pub async fn shutdown(self, timeout: Duration) {
        let stopped = self.stopped_tasks();
        if !stopped.is_empty() {
            tracing::error!(tasks = ?stopped, "Background tasks stopped before shutdown");
        }

        self.shutdown.cancel();
        let deadline = tokio::time::Instant::now() + timeout;
        for Supervised { name, handle, .. } in self.tasks {
            let abort = handle.abort_handle();
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => tracing::debug!(task = name, "Background task stopped"),
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "Background task join failed"),
                Err(_) => {
                    tracing::warn!(task = name, "Background task ignored shutdown, aborting");
                    abort.abort();
                }
            }
        }
        tracing::info!("Background tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn worker_observes_cancellation() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        tasks.spawn("order_worker", TaskKind::Worker, async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.len(), 1);
        assert!(tasks.stopped_tasks().is_empty());

        tasks.shutdown(Duration::from_secs(1)).await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_worker_is_reported_stopped() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("order_worker", TaskKind::Worker, async {
            panic!("boom");
        });
        tasks.spawn("shop_cache_warmup", TaskKind::Warmup, async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tasks.stopped_tasks(), ["order_worker"]);
        tasks.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn task_ignoring_shutdown_is_aborted() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("log_cleanup", TaskKind::Periodic, std::future::pending());
        tasks.shutdown(Duration::from_millis(50)).await;
    }

    #[test]
    fn panic_payloads_are_readable() {
        let text: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(text.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
