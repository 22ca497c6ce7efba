// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Contracts for the two external services a solver talks to
//!
//! - **SampleSource** (aggregator): connect, install a subscription rule, pull samples
//! - **FactSink** (world model): announce schemas, connect, wait for the handshake,
//!   publish attributes
//!
//! All calls are blocking. Implementations are owned by exactly one solver and
//! never shared between threads.

use crate::attribute::{Attribute, AttributeSchema};
use crate::error::Result;
use crate::sample::Sample;
use crate::subscription::SubscriptionRule;
use std::thread;
use std::time::{Duration, Instant};

/// Spacing of readiness checks for sinks without a notification mechanism
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle shared by both collaborators
pub trait Connection: Send {
    /// Open the connection, giving up after `timeout`
    fn connect(&mut self, timeout: Duration) -> Result<()>;

    /// Release the connection. Called at most once per successful `connect`.
    fn disconnect(&mut self) -> Result<()>;
}

/// Upstream source of physical-layer samples
pub trait SampleSource: Connection {
    /// Install a subscription rule; no samples flow before one is installed
    fn add_rule(&mut self, rule: SubscriptionRule) -> Result<()>;

    /// Block until the next sample arrives.
    ///
    /// `Ok(None)` means the stream has ended and no further samples will come.
    fn next_sample(&mut self) -> Result<Option<Sample>>;
}

/// Downstream store of attribute facts
pub trait FactSink: Connection {
    /// Declare an attribute name. Buffered until the post-connect handshake.
    fn announce_schema(&mut self, schema: AttributeSchema);

    /// True once the post-connect handshake has completed
    fn is_ready(&self) -> bool;

    /// Block until ready or `timeout` elapses; returns readiness.
    ///
    /// The default checks `is_ready` every [`READY_POLL_INTERVAL`], never
    /// sleeping past the deadline. Sinks that can be notified of the handshake
    /// should override this.
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_ready() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(READY_POLL_INTERVAL.min(remaining));
        }
    }

    fn publish(&mut self, attribute: &Attribute) -> Result<()>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn connect(&mut self, timeout: Duration) -> Result<()> {
        (**self).connect(timeout)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn add_rule(&mut self, rule: SubscriptionRule) -> Result<()> {
        (**self).add_rule(rule)
    }

    fn next_sample(&mut self) -> Result<Option<Sample>> {
        (**self).next_sample()
    }
}

impl<K: FactSink + ?Sized> FactSink for Box<K> {
    fn announce_schema(&mut self, schema: AttributeSchema) {
        (**self).announce_schema(schema)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn wait_ready(&mut self, timeout: Duration) -> bool {
        (**self).wait_ready(timeout)
    }

    fn publish(&mut self, attribute: &Attribute) -> Result<()> {
        (**self).publish(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSink {
        ready: bool,
    }

    impl Connection for FixedSink {
        fn connect(&mut self, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl FactSink for FixedSink {
        fn announce_schema(&mut self, _schema: AttributeSchema) {}

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn publish(&mut self, _attribute: &Attribute) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_wait_ready_gives_up_after_timeout() {
        let mut sink = FixedSink { ready: false };
        let start = Instant::now();
        assert!(!sink.wait_ready(Duration::from_millis(300)));
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn test_default_wait_ready_honours_timeouts_below_poll_interval() {
        let mut sink = FixedSink { ready: false };
        let start = Instant::now();
        assert!(!sink.wait_ready(Duration::from_millis(30)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < READY_POLL_INTERVAL, "waited {:?}", elapsed);
    }

    #[test]
    fn test_default_wait_ready_returns_immediately_when_ready() {
        let mut sink = FixedSink { ready: true };
        let start = Instant::now();
        assert!(sink.wait_ready(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
