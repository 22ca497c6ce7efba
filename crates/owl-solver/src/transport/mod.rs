// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! TCP clients for the aggregator and the world model
//!
//! Both speak newline-delimited JSON (see [`codec`]). The clients expose the
//! blocking [`SampleSource`](crate::SampleSource) / [`FactSink`](crate::FactSink)
//! contracts and drive a shared tokio runtime underneath.

pub mod aggregator;
pub mod codec;
pub mod world_model;

pub use aggregator::TcpSampleSource;
pub use world_model::TcpFactSink;

use crate::deriver::AttributeDeriver;
use crate::error::{Result, SolverError};
use crate::lifecycle::{SolverLifecycle, SolverSettings};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tokio::task::{block_in_place, JoinHandle};

/// Tokio runtime shared by the blocking clients
///
/// Reuses the ambient runtime when constructed inside one, otherwise owns a
/// multi-threaded runtime of its own.
#[derive(Clone)]
pub struct RuntimeHost {
    handle: Handle,
    runtime: Option<Arc<Runtime>>,
}

impl RuntimeHost {
    pub fn new() -> Result<Self> {
        let (handle, runtime) = if let Ok(handle) = Handle::try_current() {
            (handle, None)
        } else {
            let runtime = Runtime::new()
                .map_err(|e| SolverError::Runtime(format!("Failed to create runtime: {}", e)))?;
            let handle = runtime.handle().clone();
            (handle, Some(Arc::new(runtime)))
        };
        Ok(Self { handle, runtime })
    }

    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        if Handle::try_current().is_ok() {
            block_in_place(|| self.handle.block_on(future))
        } else if let Some(runtime) = self.runtime.as_deref() {
            runtime.block_on(future)
        } else {
            self.handle.block_on(future)
        }
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

/// Cooperative stop request, observed by every blocking client call
///
/// Once triggered, [`TcpSampleSource::next_sample`] reports end-of-stream and
/// connection attempts or world-model writes still in flight give up.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so this only returns on trigger
        let _ = receiver.wait_for(|stop| *stop).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: AttributeDeriver> SolverLifecycle<TcpSampleSource, TcpFactSink, D> {
    /// Solver wired to TCP clients at the addresses in `settings`
    pub fn over_tcp(settings: SolverSettings, deriver: D, shutdown: ShutdownSignal) -> Result<Self> {
        let runtime = RuntimeHost::new()?;
        let source = TcpSampleSource::new(
            settings.aggregator_address(),
            runtime.clone(),
            shutdown.clone(),
        );
        let sink = TcpFactSink::new(
            settings.world_model_address(),
            settings.origin.clone(),
            runtime,
            shutdown,
        )
        .with_write_timeout(settings.publish_timeout);
        Ok(SolverLifecycle::new(settings, source, sink, deriver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_signal_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_triggered());

        signal.trigger();
        assert!(observer.is_triggered());
    }

    #[test]
    fn test_shutdown_wait_resolves_after_trigger() {
        let runtime = RuntimeHost::new().unwrap();
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.trigger();
        });

        let finished = runtime.block_on(async {
            tokio::time::timeout(Duration::from_secs(2), signal.wait())
                .await
                .is_ok()
        });
        assert!(finished);
    }

    #[test]
    fn test_runtime_host_owns_runtime_outside_tokio() {
        let runtime = RuntimeHost::new().unwrap();
        assert!(runtime.runtime.is_some());
        assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    }
}
