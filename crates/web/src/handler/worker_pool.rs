use std::sync::Arc;

use nimble_http::handler::BoxError;
use tokio::sync::Semaphore;
use tracing::error;

/// Default number of synchronous handlers allowed to run at once
pub const DEFAULT_WORKERS: usize = 4;

/// A bounded pool for blocking work.
///
/// At most `size` closures run at the same time on tokio's blocking threads;
/// further submissions wait for a free permit.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self { permits: Arc::new(Semaphore::new(size)), size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `f` on a blocking thread once a worker is free.
    ///
    /// # Errors
    ///
    /// Fails if `f` panics or the pool has been closed.
    pub async fn run<F, T>(&self, f: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits).acquire_owned().await?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| {
            error!(cause = %e, "blocking handler failed");
            e.into()
        })
    }
}
