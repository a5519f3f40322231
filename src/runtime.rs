//! Runtime abstraction layer for async operations
//!
//! Fetches are spawned through an `AsyncSpawner` so the plugin does not
//! hard-wire an executor. Tokio is the default; embedders on another
//! runtime install their own spawner with `init_runtime`.

use crate::{Error, Result};
use futures::future::FutureExt;
use std::future::Future;

pub type BoxFuture = futures::future::BoxFuture<'static, ()>;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxFuture) -> Result<Box<dyn AsyncHandle>>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);

    /// Wait for the task to finish or be cancelled
    fn join(self: Box<Self>) -> BoxFuture;
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::debug!("runtime::spawn() - spawning async task");
    match runtime() {
        Some(spawner) => spawner.spawn_boxed(future.boxed()),
        None => Err(Error::Plugin(
            "no async runtime available; enable 'tokio-runtime' or call init_runtime".to_string(),
        )),
    }
}

/// Default spawner implementations
pub mod spawners {
    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::super::{AsyncHandle, AsyncSpawner, BoxFuture};
        use crate::{Error, Result};
        use ::tokio::task::JoinHandle;
        use futures::future::FutureExt;

        /// Tokio-based async spawner
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxFuture) -> Result<Box<dyn AsyncHandle>> {
                let handle = ::tokio::runtime::Handle::try_current()
                    .map_err(|e| Error::Plugin(format!("not inside a tokio runtime: {}", e)))?;
                Ok(Box::new(TokioHandle(handle.spawn(future))))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }

            fn join(self: Box<Self>) -> BoxFuture {
                async move {
                    if let Err(e) = self.0.await {
                        if e.is_panic() {
                            log::error!("spawned task panicked: {}", e);
                        }
                    }
                }
                .boxed()
            }
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner; ignored once a spawner is set
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) -> bool {
    RUNTIME.set(spawner).is_ok()
}

/// Get the global runtime spawner
pub fn runtime() -> Option<&'static dyn AsyncSpawner> {
    #[cfg(feature = "tokio-runtime")]
    {
        Some(
            RUNTIME
                .get_or_init(|| Box::new(spawners::tokio_impl::TokioSpawner))
                .as_ref(),
        )
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        RUNTIME.get().map(|spawner| spawner.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        })
        .unwrap();

        // Should not be finished immediately
        assert!(!handle.is_finished());

        handle.join().await;
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_cancelled_task_joins() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_secs(60)).await;
        })
        .unwrap();

        handle.cancel();
        handle.join().await;
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_spawn_outside_runtime_fails() {
        assert!(spawn(async {}).is_err());
    }
}
