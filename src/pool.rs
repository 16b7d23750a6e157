use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// A fixed number of tasks taking jobs from a shared FIFO queue.
///
/// Each worker handles one job at a time. Workers stop once every sender
/// of the queue is dropped and the queued jobs are drained.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<T, F, Fut>(size: usize, queue: UnboundedReceiver<T>, handler: F) -> WorkerPool
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let queue = Arc::new(Mutex::new(queue));

        let workers = (0..size)
            .map(|worker| {
                let queue = queue.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    loop {
                        // The lock is only held while waiting for the next job.
                        let job = queue.lock().await.recv().await;
                        match job {
                            Some(job) => handler(job).await,
                            None => break,
                        }
                    }
                    debug!(worker, "worker stopped");
                })
            })
            .collect();

        WorkerPool { workers }
    }

    /// Waits for every worker to stop.
    pub async fn join(self) {
        join_all(self.workers).await;
    }
}
