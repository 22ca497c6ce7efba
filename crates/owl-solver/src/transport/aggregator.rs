// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Aggregator client: handshake, rule installation, sample stream

use super::codec::{
    decode_line, verify_handshake, write_message, AggregatorMessage, AGGREGATOR_PROTOCOL,
};
use super::{RuntimeHost, ShutdownSignal};
use crate::collaborators::{Connection, SampleSource};
use crate::error::{Collaborator, Result, SolverError};
use crate::sample::Sample;
use crate::subscription::SubscriptionRule;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

type LineReader = Lines<BufReader<OwnedReadHalf>>;

pub struct TcpSampleSource {
    address: String,
    runtime: RuntimeHost,
    shutdown: ShutdownSignal,
    reader: Option<LineReader>,
    writer: Option<OwnedWriteHalf>,
    rule: Option<SubscriptionRule>,
}

impl TcpSampleSource {
    pub fn new(address: impl Into<String>, runtime: RuntimeHost, shutdown: ShutdownSignal) -> Self {
        Self {
            address: address.into(),
            runtime,
            shutdown,
            reader: None,
            writer: None,
            rule: None,
        }
    }
}

async fn open_stream(address: &str) -> Result<(LineReader, OwnedWriteHalf)> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half).lines();

    write_message(&mut writer, &AggregatorMessage::handshake()).await?;

    let reply = reader
        .next_line()
        .await?
        .ok_or_else(|| SolverError::Protocol("aggregator closed during handshake".to_string()))?;
    match decode_line::<AggregatorMessage>(&reply)? {
        AggregatorMessage::Handshake { protocol, version } => {
            verify_handshake(AGGREGATOR_PROTOCOL, &protocol, version)?
        }
        other => {
            return Err(SolverError::Protocol(format!(
                "expected handshake from aggregator, got {:?}",
                other
            )))
        }
    }

    Ok((reader, writer))
}

impl Connection for TcpSampleSource {
    fn connect(&mut self, timeout: Duration) -> Result<()> {
        let address = self.address.clone();
        let shutdown = &self.shutdown;
        let attempt = self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = shutdown.wait() => None,
                attempt = tokio::time::timeout(timeout, open_stream(&address)) => Some(attempt),
            }
        });

        let (reader, writer) = match attempt {
            Some(Ok(Ok(halves))) => halves,
            Some(Ok(Err(e))) => {
                return Err(SolverError::connection_failed(Collaborator::Aggregator, e))
            }
            None => {
                return Err(SolverError::connection_failed(
                    Collaborator::Aggregator,
                    "shutdown requested",
                ))
            }
            Some(Err(_)) => {
                return Err(SolverError::connection_failed(
                    Collaborator::Aggregator,
                    format!("timed out after {:?}", timeout),
                ))
            }
        };

        debug!("[AGGREGATOR] handshake complete with {}", self.address);
        self.reader = Some(reader);
        self.writer = Some(writer);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.reader = None;
        self.rule = None;
        if let Some(mut writer) = self.writer.take() {
            self.runtime.block_on(writer.shutdown())?;
        }
        Ok(())
    }
}

impl SampleSource for TcpSampleSource {
    fn add_rule(&mut self, rule: SubscriptionRule) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(SolverError::NotConnected)?;
        self.runtime
            .block_on(write_message(writer, &AggregatorMessage::Subscribe { rule }))?;
        self.rule = Some(rule);
        Ok(())
    }

    fn next_sample(&mut self) -> Result<Option<Sample>> {
        let rule = self.rule.ok_or_else(|| {
            SolverError::Protocol("no subscription rule installed".to_string())
        })?;
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        self.runtime
            .block_on(read_sample(reader, rule, &self.shutdown))
    }
}

/// Next admitted sample, or `None` on end-of-stream or shutdown
async fn read_sample(
    reader: &mut LineReader,
    rule: SubscriptionRule,
    shutdown: &ShutdownSignal,
) -> Result<Option<Sample>> {
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.wait() => {
                debug!("[AGGREGATOR] shutdown requested, ending sample stream");
                return Ok(None);
            }
            line = reader.next_line() => line?,
        };

        let line = match line {
            Some(line) => line,
            None => return Ok(None),
        };
        if line.trim().is_empty() {
            continue;
        }

        // Only I/O errors end the stream; a frame we cannot decode is dropped
        let message = match decode_line::<AggregatorMessage>(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("[AGGREGATOR] dropping undecodable line: {}", e);
                continue;
            }
        };

        match message {
            AggregatorMessage::Sample { sample } if rule.admits(&sample) => {
                return Ok(Some(sample));
            }
            AggregatorMessage::Sample { sample } => {
                trace!("[AGGREGATOR] dropping sample outside rule: {:?}", sample);
            }
            AggregatorMessage::SubscriptionAck { rule } => {
                debug!("[AGGREGATOR] subscription acknowledged: {:?}", rule);
            }
            other => warn!("[AGGREGATOR] ignoring unexpected message {:?}", other),
        }
    }
}
