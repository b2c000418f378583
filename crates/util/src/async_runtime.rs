//! Async runtime helpers for blocking callers.
//!
//! The engine is synchronous while `reqwest` is async. This module provides a
//! single entry point for executing futures from synchronous code paths,
//! reusing the current Tokio runtime when it can block in place.

use std::future::Future;

use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::task;

/// Execute an async future from synchronous code.
///
/// # Notes
/// - Inside a multi-threaded runtime the current worker blocks in place.
/// - Inside a current-thread runtime the future runs on a helper thread with
///   its own runtime, since blocking the only worker would deadlock.
/// - Outside Tokio a single-threaded runtime is built for the call.
///
/// # Errors
/// Returns an I/O error when a runtime cannot be created.
pub fn block_on_future<F, T>(future: F) -> std::io::Result<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => Ok(task::block_in_place(|| handle.block_on(future))),
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| run_on_fresh_runtime(future))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => run_on_fresh_runtime(future),
    }
}

fn run_on_fresh_runtime<F, T>(future: F) -> std::io::Result<T>
where
    F: Future<Output = T>,
{
    Ok(Builder::new_current_thread().enable_all().build()?.block_on(future))
}
