use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Bounded pool running cache rebuilds off the request path.
///
/// At most `concurrency` rebuilds run at once; further ones wait for a
/// permit. Drain with [`close`](Self::close) then [`wait`](Self::wait).
#[derive(Clone)]
pub struct RebuildPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl RebuildPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Schedule a rebuild; false (and nothing scheduled) once the pool is closed
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            tracing::warn!("Rebuild pool closed, dropping rebuild");
            return false;
        }
        let permits = self.permits.clone();
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        });
        true
    }

    /// Stop accepting rebuilds
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Wait until every scheduled rebuild has finished (after [`close`](Self::close))
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Rebuilds scheduled or running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
