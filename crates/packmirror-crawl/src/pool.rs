use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs submitted futures with at most `max_concurrent` executing at once.
///
/// `submit` waits for a free slot, so a producer that outpaces the workers
/// is slowed down rather than queueing unboundedly.
pub struct WorkerPool<T> {
    semaphore: Arc<Semaphore>,
    tasks:     JoinSet<T>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// A pool of `max_concurrent` workers; zero is treated as one.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks:     JoinSet::new(),
        }
    }

    pub async fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        // the semaphore is never closed, so this only fails if that changes
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
    }

    /// Wait for every submitted task. A task that panicked is logged and
    /// contributes no result; its siblings are unaffected.
    pub async fn join_all(mut self) -> Vec<T> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(value) => results.push(value),
                Err(e) => tracing::error!(error = %e, "worker task failed"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_concurrency() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPool::new(3);
        for i in 0..10 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                i
            })
            .await;
        }

        let mut results = pool.join_all().await;
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_task_is_dropped() {
        let mut pool = WorkerPool::new(2);
        pool.submit(async { 1 }).await;
        pool.submit(async { panic!("boom") }).await;
        pool.submit(async { 3 }).await;

        let mut results = pool.join_all().await;
        results.sort_unstable();
        assert_eq!(results, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_zero_workers_is_one() {
        let mut pool = WorkerPool::new(0);
        pool.submit(async { "done" }).await;
        assert_eq!(pool.join_all().await, vec!["done"]);
    }
}
