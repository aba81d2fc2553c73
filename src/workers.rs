//! Shared bounded worker-pool helper (spec §5).
//!
//! The same shape is reused by the Bulk Cloner, Dangling Scanner, and
//! Backup/Restore: a bounded job channel, N stateless workers, a bounded
//! result channel, and a single reducer.

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { concurrency: 10 }
    }
}

/// Runs `jobs` through `work` with up to `config.concurrency` workers in
/// flight, reducing every result through `reduce` on the calling task.
/// Returns once every job has been dispatched, every worker has drained,
/// and `reduce` has consumed every result (or cancellation was observed).
pub async fn run_pool<J, R, W, Fut, Reduce>(
    config: WorkerPoolConfig,
    jobs: Vec<J>,
    cancel: CancellationToken,
    work: W,
    mut reduce: Reduce,
) where
    J: Send + 'static,
    R: Send + 'static,
    W: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = R> + Send,
    Reduce: FnMut(R),
{
    let concurrency = config.concurrency.max(1);
    let (job_tx, job_rx) = mpsc::channel::<J>(concurrency * 2);
    let (result_tx, mut result_rx) = mpsc::channel::<R>(concurrency * 2);

    let job_rx = std::sync::Arc::new(tokio::sync::Mutex::new(job_rx));
    let work = std::sync::Arc::new(work);

    let mut workers = JoinSet::new();
    for _ in 0..concurrency {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let work = work.clone();
        let cancel = cancel.clone();

        workers.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return;
                }

                let job = {
                    let mut rx = job_rx.lock().await;
                    rx.recv().await
                };

                let Some(job) = job else {
                    return;
                };

                let result = work(job).await;
                if result_tx.send(result).await.is_err() {
                    return;
                }
            }
        });
    }
    drop(result_tx);

    let dispatcher = tokio::spawn(async move {
        for job in jobs {
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = result_rx.recv().await {
        reduce(result);
    }

    let _ = dispatcher.await;
    while workers.join_next().await.is_some() {}
}
