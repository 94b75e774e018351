use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooperative cancellation flag shared by the items of one batch.
///
/// Raised when any item fails. Items that have not started yet are skipped;
/// running items may poll [`Interrupt::is_raised`] to stop early.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded worker pool for content transfer and fixity checks.
///
/// The pool owns a small tokio runtime whose blocking threads do the work.
/// [`ParallelProcess::collection`] is synchronous: it returns once every
/// started item has finished, with the first failure if any item failed.
/// It must not be called from inside another tokio runtime.
pub struct ParallelProcess {
    runtime: Mutex<Option<Runtime>>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ParallelProcess {
    /// Create a pool running at most `workers` items at once.
    pub fn new(workers: usize) -> StorageResult<Self> {
        if workers == 0 {
            return Err(StorageError::ConfigurationInvalid(
                "worker pool needs at least one worker".into(),
            ));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("ocfl-worker")
            .enable_all()
            .build()?;
        debug!(workers, "worker pool started");
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `action` once per item, at most `workers` at a time.
    ///
    /// Waits for every started item. If any item fails, the interrupt is
    /// raised, items not yet started are skipped, and the earliest failure
    /// is returned. A panicking item is resumed on the calling thread after
    /// the remaining items have drained.
    pub fn collection<I, T, F>(&self, items: I, action: F) -> StorageResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(T, &Interrupt) -> StorageResult<()> + Send + Sync + 'static,
    {
        let handle = self
            .runtime
            .lock()
            .as_ref()
            .map(|runtime| runtime.handle().clone())
            .ok_or_else(|| StorageError::IllegalState("worker pool is shut down".into()))?;

        let action = Arc::new(action);
        let interrupt = Interrupt::new();
        let first_error: Arc<Mutex<Option<StorageError>>> = Arc::new(Mutex::new(None));

        let panic = handle.block_on(async {
            let mut tasks = JoinSet::new();
            for item in items {
                if interrupt.is_raised() {
                    break;
                }
                let Ok(permit) = self.permits.clone().acquire_owned().await else {
                    break;
                };
                let action = Arc::clone(&action);
                let interrupt = interrupt.clone();
                let first_error = Arc::clone(&first_error);
                tasks.spawn_blocking(move || {
                    let _permit = permit;
                    if interrupt.is_raised() {
                        return;
                    }
                    if let Err(e) = action(item, &interrupt) {
                        first_error.lock().get_or_insert(e);
                        interrupt.raise();
                    }
                });
            }

            let mut panic: Option<Box<dyn Any + Send>> = None;
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    interrupt.raise();
                    if e.is_panic() {
                        panic.get_or_insert(e.into_panic());
                    } else {
                        first_error.lock().get_or_insert(StorageError::IllegalState(format!(
                            "worker task failed: {e}"
                        )));
                    }
                }
            }
            panic
        });

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        let first = first_error.lock().take();
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop the pool. Later calls to [`ParallelProcess::collection`] fail
    /// with [`StorageError::IllegalState`]. Idempotent.
    pub fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
            debug!("worker pool stopped");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.runtime.lock().is_none()
    }
}

impl Drop for ParallelProcess {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            debug!("worker pool dropped without shutdown");
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for ParallelProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelProcess")
            .field("workers", &self.workers)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
