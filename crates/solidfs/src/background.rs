//! I define the dedicated executor hosting long-lived async tasks.
//!
//! The kernel bridge drives operations from its own worker threads,
//! which may be recycled or preempted in ways that break tasks pinned
//! to them. Long-lived work runs on this executor instead; kernel
//! driven operations submit futures to it and block on completion.
//!

use std::future::Future;

use tokio::{runtime, task::JoinHandle};

/// The background executor.
#[derive(Debug)]
pub struct Background {
    runtime: runtime::Runtime,
}

impl Background {
    /// Create the executor with its single named worker thread.
    pub fn new() -> std::io::Result<Self> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("solidfs-background")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Run a future to completion, blocking the calling thread.
    #[inline]
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Spawn a long-lived task onto the executor.
    #[inline]
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }
}
