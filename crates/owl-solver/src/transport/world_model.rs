// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! World-model client
//!
//! Schemas announced before the connection exists are held back and sent in a
//! single `attribute_announce` once the server's handshake arrives. A background
//! reader task watches for that handshake and wakes [`TcpFactSink::wait_ready`]
//! through a watch channel.
//!
//! Every write is bounded by the sink's write timeout and gives up as soon as
//! the shutdown signal fires.

use super::codec::{
    decode_line, verify_handshake, write_message, WorldModelMessage, WORLD_MODEL_PROTOCOL,
};
use super::{RuntimeHost, ShutdownSignal};
use crate::attribute::{Attribute, AttributeSchema};
use crate::collaborators::{Connection, FactSink};
use crate::error::{Collaborator, Result, SolverError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bound on a single frame write unless overridden
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TcpFactSink {
    address: String,
    origin: String,
    runtime: RuntimeHost,
    shutdown: ShutdownSignal,
    write_timeout: Duration,
    pending: Vec<AttributeSchema>,
    writer: Option<OwnedWriteHalf>,
    reader_task: Option<JoinHandle<()>>,
    handshake_rx: Option<watch::Receiver<bool>>,
    ready: bool,
}

impl TcpFactSink {
    pub fn new(
        address: impl Into<String>,
        origin: impl Into<String>,
        runtime: RuntimeHost,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            address: address.into(),
            origin: origin.into(),
            runtime,
            shutdown,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            pending: Vec::new(),
            writer: None,
            reader_task: None,
            handshake_rx: None,
            ready: false,
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Write one frame, giving up on shutdown or after `write_timeout`
    ///
    /// A failed write may leave half a frame on the wire, so the writer is
    /// dropped and every later send fails with `NotConnected`.
    fn send(&mut self, message: &WorldModelMessage) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(SolverError::NotConnected)?;
        let write_timeout = self.write_timeout;
        let shutdown = &self.shutdown;
        let outcome = self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = shutdown.wait() => Err(SolverError::ShutdownRequested),
                written = tokio::time::timeout(write_timeout, write_message(writer, message)) => {
                    written.unwrap_or(Err(SolverError::WriteTimeout(
                        write_timeout.as_millis() as u64,
                    )))
                }
            }
        });

        if let Err(e) = &outcome {
            warn!("[WORLD-MODEL] write failed, abandoning connection: {}", e);
            self.writer = None;
        }
        outcome
    }

    fn flush_announcements(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let message = WorldModelMessage::AttributeAnnounce {
            origin: self.origin.clone(),
            schemas: self.pending.clone(),
        };
        self.send(&message)?;

        info!(
            "[WORLD-MODEL] announced {} attribute(s) as '{}'",
            self.pending.len(),
            self.origin
        );
        self.pending.clear();
        Ok(())
    }
}

async fn open_stream(address: &str, origin: &str) -> Result<(OwnedReadHalf, OwnedWriteHalf)> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    let (reader, mut writer) = stream.into_split();
    write_message(&mut writer, &WorldModelMessage::handshake(origin)).await?;
    Ok((reader, writer))
}

/// Watch the inbound side; flips `handshake_tx` on a valid server handshake
async fn read_replies(reader: OwnedReadHalf, handshake_tx: watch::Sender<bool>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("[WORLD-MODEL] server closed the connection");
                return;
            }
            Err(e) => {
                warn!("[WORLD-MODEL] read failed: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode_line::<WorldModelMessage>(&line) {
            Ok(WorldModelMessage::Handshake {
                protocol, version, ..
            }) => match verify_handshake(WORLD_MODEL_PROTOCOL, &protocol, version) {
                Ok(()) => {
                    debug!("[WORLD-MODEL] handshake received");
                    handshake_tx.send_replace(true);
                }
                Err(e) => warn!("[WORLD-MODEL] rejecting handshake: {}", e),
            },
            Ok(other) => debug!("[WORLD-MODEL] ignoring {:?}", other),
            Err(e) => warn!("[WORLD-MODEL] undecodable line: {}", e),
        }
    }
}

impl Connection for TcpFactSink {
    fn connect(&mut self, timeout: Duration) -> Result<()> {
        let address = self.address.clone();
        let origin = self.origin.clone();
        let shutdown = &self.shutdown;
        let attempt = self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = shutdown.wait() => None,
                attempt = tokio::time::timeout(timeout, open_stream(&address, &origin)) => Some(attempt),
            }
        });

        let (reader, writer) = match attempt {
            Some(Ok(Ok(halves))) => halves,
            Some(Ok(Err(e))) => {
                return Err(SolverError::connection_failed(Collaborator::WorldModel, e))
            }
            None => {
                return Err(SolverError::connection_failed(
                    Collaborator::WorldModel,
                    "shutdown requested",
                ))
            }
            Some(Err(_)) => {
                return Err(SolverError::connection_failed(
                    Collaborator::WorldModel,
                    format!("timed out after {:?}", timeout),
                ))
            }
        };

        let (handshake_tx, handshake_rx) = watch::channel(false);
        self.reader_task = Some(self.runtime.spawn(read_replies(reader, handshake_tx)));
        self.handshake_rx = Some(handshake_rx);
        self.writer = Some(writer);
        self.ready = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.ready = false;
        self.handshake_rx = None;
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            self.runtime.block_on(writer.shutdown())?;
        }
        Ok(())
    }
}

impl FactSink for TcpFactSink {
    fn announce_schema(&mut self, schema: AttributeSchema) {
        if self.pending.iter().any(|s| s.name == schema.name) {
            return;
        }
        self.pending.push(schema);
        if self.ready {
            if let Err(e) = self.flush_announcements() {
                warn!("[WORLD-MODEL] late announcement failed: {}", e);
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn wait_ready(&mut self, timeout: Duration) -> bool {
        if self.ready {
            return true;
        }
        let mut handshake_rx = match self.handshake_rx.clone() {
            Some(rx) => rx,
            None => return false,
        };

        let shutdown = &self.shutdown;
        let shook_hands = self.runtime.block_on(async move {
            tokio::select! {
                biased;
                _ = shutdown.wait() => false,
                done = tokio::time::timeout(timeout, handshake_rx.wait_for(|done| *done)) => {
                    matches!(done, Ok(Ok(_)))
                }
            }
        });
        if !shook_hands {
            return false;
        }

        if let Err(e) = self.flush_announcements() {
            warn!("[WORLD-MODEL] announcing attributes failed: {}", e);
            return false;
        }
        self.ready = true;
        true
    }

    fn publish(&mut self, attribute: &Attribute) -> Result<()> {
        if !self.ready {
            return Err(SolverError::Protocol(
                "world model handshake has not completed".to_string(),
            ));
        }
        let message = WorldModelMessage::AttributeUpdate {
            attribute: attribute.clone(),
        };
        self.send(&message)
    }
}
