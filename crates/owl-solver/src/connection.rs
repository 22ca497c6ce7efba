// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scoped ownership of one collaborator connection
//!
//! A [`ConnectionHandle`] is acquired when the solver connects and released
//! exactly once on every exit path: explicitly through [`ConnectionHandle::release`]
//! or implicitly on drop. Release errors are logged and swallowed; nothing after
//! teardown depends on them.

use crate::collaborators::Connection;
use crate::error::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle of a collaborator connection
///
/// `New -> Connecting -> Connected -> (Ready) -> Closed`. Only the fact sink
/// reaches `Ready`, after its post-connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Ready,
    Closed,
}

impl ConnectionState {
    /// True while the remote side may hold resources for us
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Ready
        )
    }
}

pub struct ConnectionHandle<C: Connection> {
    label: &'static str,
    state: ConnectionState,
    inner: C,
}

impl<C: Connection> ConnectionHandle<C> {
    pub fn new(label: &'static str, inner: C) -> Self {
        Self {
            label,
            state: ConnectionState::New,
            inner,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Connect the collaborator with a bounded wait
    ///
    /// A failed attempt leaves the handle `Closed` without calling `disconnect`:
    /// nothing was acquired.
    pub fn open(&mut self, timeout: Duration) -> Result<()> {
        self.state = ConnectionState::Connecting;
        debug!("[{}] connecting (timeout {:?})", self.label, timeout);

        match self.inner.connect(timeout) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("[{}] connected", self.label);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    /// Record that the post-connect handshake completed
    pub fn mark_ready(&mut self) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Ready;
        }
    }

    /// Disconnect if open; a second call is a no-op
    pub fn release(&mut self) {
        if !self.state.is_open() {
            return;
        }
        self.state = ConnectionState::Closed;

        match self.inner.disconnect() {
            Ok(()) => debug!("[{}] disconnected", self.label),
            Err(e) => debug!("[{}] ignoring disconnect error: {}", self.label, e),
        }
    }
}

impl<C: Connection> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        self.release();
    }
}
