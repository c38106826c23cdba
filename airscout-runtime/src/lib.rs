use anyhow::{Context, Result};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Conventional status for a process ended by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cloneable access to the runtime and its shutdown token.
#[derive(Clone)]
pub struct AirscoutHandle {
    inner: Handle,
    cancel: CancellationToken,
}

/// Tokio runtime plus the one cancellation token every batch listens to.
pub struct AirscoutRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl AirscoutRuntime {
    /// Build a multi-threaded runtime.
    ///
    /// ```
    /// use airscout_runtime::AirscoutRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = AirscoutRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build().context("building tokio runtime")?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> AirscoutHandle {
        AirscoutHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// The shared token; cancelling it stops running batches at their next
    /// step boundary.
    ///
    /// ```
    /// use airscout_runtime::AirscoutRuntime;
    ///
    /// let runtime = AirscoutRuntime::build("token-example", Some(1)).unwrap();
    /// let token = runtime.cancellation();
    /// assert!(!token.is_cancelled());
    /// runtime.handle().cancellation().cancel();
    /// assert!(token.is_cancelled());
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token on the first Ctrl-C.
    ///
    /// Once installed, the handler replaces the default SIGINT behaviour for
    /// the rest of the process, so the watcher keeps listening after the
    /// first signal and exits with status 130 on the second one.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, cancel).await == Interrupt::Forced {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    ///
    /// ```
    /// use airscout_runtime::AirscoutRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = AirscoutRuntime::build("shutdown-example", Some(1)).unwrap();
    /// let token = runtime.cancellation();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(token.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

/// How [`watch_interrupts`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The token was cancelled before any signal arrived.
    CancelledElsewhere,
    /// The signal source failed; nothing was cancelled.
    Unavailable,
    /// A second signal arrived after the token had been cancelled.
    Forced,
}

/// Cancel `cancel` on the first signal and report [`Interrupt::Forced`] on
/// the second. `next_signal` resolves once per delivered signal.
pub async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: CancellationToken) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        _ = cancel.cancelled() => return Interrupt::CancelledElsewhere,
        res = next_signal() => {
            if let Err(e) = res {
                tracing::error!(target: "runtime", error = %e, "runtime.signal_unavailable");
                return Interrupt::Unavailable;
            }
            tracing::warn!(target: "runtime", "runtime.interrupt");
            cancel.cancel();
        }
    }
    match next_signal().await {
        Ok(()) => {
            tracing::error!(target: "runtime", "runtime.forced_exit");
            Interrupt::Forced
        }
        Err(e) => {
            tracing::error!(target: "runtime", error = %e, "runtime.signal_unavailable");
            Interrupt::Unavailable
        }
    }
}

impl AirscoutHandle {
    /// Spawn a future onto the shared runtime.
    ///
    /// ```
    /// use airscout_runtime::AirscoutRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = AirscoutRuntime::build("handle-doctest", Some(1)).unwrap();
    /// let task = runtime.handle().spawn(async { 21 * 2 });
    /// let result = runtime.block_on(async move { task.await.unwrap() });
    /// assert_eq!(result, 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_c_watcher_exits_when_token_cancelled() {
        let runtime = AirscoutRuntime::build("ctrl-c-test", Some(1)).unwrap();
        let watcher = runtime.cancel_on_ctrl_c();
        runtime.cancellation().cancel();
        runtime.block_on(async {
            tokio::time::timeout(Duration::from_secs(1), watcher)
                .await
                .expect("watcher finished")
                .expect("watcher did not panic");
        });
        runtime.shutdown(Duration::from_millis(10));
    }

    #[tokio::test]
    async fn second_interrupt_forces_exit() {
        use std::sync::Arc;
        use tokio::sync::Semaphore;

        let signals = Arc::new(Semaphore::new(0));
        let source = signals.clone();
        let next_signal = move || {
            let source = source.clone();
            async move {
                source
                    .acquire()
                    .await
                    .map(|permit| permit.forget())
                    .map_err(std::io::Error::other)
            }
        };
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupts(next_signal, cancel.clone()));

        signals.add_permits(1);
        tokio::time::timeout(Duration::from_secs(1), cancel.cancelled())
            .await
            .expect("first signal cancels the token");
        assert!(!watcher.is_finished());

        signals.add_permits(1);
        let outcome = tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher finished")
            .unwrap();
        assert_eq!(outcome, Interrupt::Forced);
    }

    #[tokio::test]
    async fn failing_signal_source_cancels_nothing() {
        let cancel = CancellationToken::new();
        let outcome = watch_interrupts(
            || async { Err(std::io::Error::other("no signal driver")) },
            cancel.clone(),
        )
        .await;
        assert_eq!(outcome, Interrupt::Unavailable);
        assert!(!cancel.is_cancelled());
    }
}
