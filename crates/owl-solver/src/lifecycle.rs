// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Solver lifecycle: connection sequencing, the sample loop, and teardown
//!
//! ```ignore
//! use owl_solver::{NearbyDeriver, ShutdownSignal, SolverLifecycle, SolverSettings};
//!
//! let settings = SolverSettings::new("localhost", 7008, "localhost", 7009);
//! let mut solver = SolverLifecycle::over_tcp(settings, NearbyDeriver::default(), ShutdownSignal::new())?;
//! solver.connect()?;
//! let summary = solver.start()?.join().expect("solver thread panicked")?;
//! ```

use crate::attribute::{Attribute, AttributeSchema, SchemaSet};
use crate::collaborators::{FactSink, SampleSource};
use crate::connection::{ConnectionHandle, ConnectionState};
use crate::deriver::AttributeDeriver;
use crate::error::{Collaborator, Result, SolverError};
use crate::sample::Sample;
use crate::subscription::SubscriptionRule;
use owl_config::SolverConfig;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happens to each derived attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Send to the world model
    #[default]
    Publish,
    /// Log only; nothing is written to the world model
    LogOnly,
}

/// Connection parameters and bounds for one solver
#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub aggregator_host: String,
    pub aggregator_port: u16,
    pub world_model_host: String,
    pub world_model_port: u16,
    pub aggregator_connect_timeout: Duration,
    pub world_model_connect_timeout: Duration,
    pub ready_timeout: Duration,
    /// Bound on a single world-model write
    pub publish_timeout: Duration,
    pub origin: String,
    pub publish_mode: PublishMode,
}

impl SolverSettings {
    /// Settings with the default bounds: 10s per connection attempt, 5s for the
    /// handshake and 5s per world-model write
    pub fn new(
        aggregator_host: impl Into<String>,
        aggregator_port: u16,
        world_model_host: impl Into<String>,
        world_model_port: u16,
    ) -> Self {
        Self {
            aggregator_host: aggregator_host.into(),
            aggregator_port,
            world_model_host: world_model_host.into(),
            world_model_port,
            aggregator_connect_timeout: Duration::from_secs(10),
            world_model_connect_timeout: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(5),
            origin: crate::deriver::DEFAULT_ORIGIN.to_string(),
            publish_mode: PublishMode::Publish,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            aggregator_host: config.aggregator.host.clone(),
            aggregator_port: config.aggregator.port,
            world_model_host: config.world_model.host.clone(),
            world_model_port: config.world_model.port,
            aggregator_connect_timeout: Duration::from_millis(config.aggregator.connect_timeout_ms),
            world_model_connect_timeout: Duration::from_millis(
                config.world_model.connect_timeout_ms,
            ),
            ready_timeout: Duration::from_millis(config.world_model.ready_timeout_ms),
            publish_timeout: Duration::from_millis(config.world_model.publish_timeout_ms),
            origin: config.world_model.origin.clone(),
            publish_mode: if config.solver.publish {
                PublishMode::Publish
            } else {
                PublishMode::LogOnly
            },
        }
    }

    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = mode;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, ready: Duration) -> Self {
        self.aggregator_connect_timeout = connect;
        self.world_model_connect_timeout = connect;
        self.ready_timeout = ready;
        self
    }

    pub fn with_publish_timeout(mut self, publish: Duration) -> Self {
        self.publish_timeout = publish;
        self
    }

    pub fn aggregator_address(&self) -> String {
        format!("{}:{}", self.aggregator_host, self.aggregator_port)
    }

    pub fn world_model_address(&self) -> String {
        format!("{}:{}", self.world_model_host, self.world_model_port)
    }
}

/// Why the sample loop ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    EndOfStream,
    /// Sample retrieval failed; the loop treats this like end-of-stream
    SourceError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub samples_processed: u64,
    pub attributes_published: u64,
    pub publish_failures: u64,
    pub stop: StopReason,
}

/// Owns both collaborator connections and drives subscribe -> consume -> derive -> publish
///
/// Samples are handled one at a time, in delivery order, on a single thread.
pub struct SolverLifecycle<S, K, D>
where
    S: SampleSource,
    K: FactSink,
    D: AttributeDeriver,
{
    settings: SolverSettings,
    source: ConnectionHandle<S>,
    sink: ConnectionHandle<K>,
    deriver: D,
    announced: SchemaSet,
    connected: bool,
}

impl<S, K, D> SolverLifecycle<S, K, D>
where
    S: SampleSource,
    K: FactSink,
    D: AttributeDeriver,
{
    /// Create a solver and announce the deriver's schemas to the sink
    ///
    /// Announcement happens here, before the sink connection is opened; the sink
    /// delivers the buffered schemas as part of its handshake.
    pub fn new(settings: SolverSettings, source: S, mut sink: K, deriver: D) -> Self {
        let announced = deriver.output_schemas();
        for schema in announced.iter() {
            debug!("[SOLVER] announcing attribute '{}'", schema.name);
            sink.announce_schema(schema.clone());
        }

        Self {
            settings,
            source: ConnectionHandle::new("AGGREGATOR", source),
            sink: ConnectionHandle::new("WORLD-MODEL", sink),
            deriver,
            announced,
            connected: false,
        }
    }

    /// Announce additional schemas beyond the deriver's own
    pub fn with_schemas(mut self, schemas: impl IntoIterator<Item = AttributeSchema>) -> Self {
        for schema in schemas {
            if self.announced.insert(schema.clone()) {
                debug!("[SOLVER] announcing attribute '{}'", schema.name);
                self.sink.get_mut().announce_schema(schema);
            }
        }
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn announced_schemas(&self) -> &SchemaSet {
        &self.announced
    }

    pub fn source_state(&self) -> ConnectionState {
        self.source.state()
    }

    pub fn sink_state(&self) -> ConnectionState {
        self.sink.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect to the aggregator, then the world model, then wait for the world model handshake
    ///
    /// Every failure path leaves both connections closed.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(SolverError::AlreadyConnected);
        }

        info!(
            "[SOLVER] Step 1: connecting to aggregator at {}",
            self.settings.aggregator_address()
        );
        if let Err(e) = self.source.open(self.settings.aggregator_connect_timeout) {
            error!("[SOLVER] Unable to connect to the aggregator: {}", e);
            return Err(as_connection_failure(Collaborator::Aggregator, e));
        }

        info!(
            "[SOLVER] Step 2: connecting to world model at {}",
            self.settings.world_model_address()
        );
        if let Err(e) = self.sink.open(self.settings.world_model_connect_timeout) {
            error!("[SOLVER] Unable to connect to the world model: {}", e);
            self.source.release();
            return Err(as_connection_failure(Collaborator::WorldModel, e));
        }

        info!(
            "[SOLVER] Step 3: waiting up to {:?} for world model handshake",
            self.settings.ready_timeout
        );
        if !self.sink.get_mut().wait_ready(self.settings.ready_timeout) {
            error!("[SOLVER] World model handshake did not complete in time");
            self.sink.release();
            self.source.release();
            return Err(SolverError::ReadinessTimeout(
                self.settings.ready_timeout.as_millis() as u64,
            ));
        }
        self.sink.mark_ready();

        self.connected = true;
        info!("[SOLVER] connected to aggregator and world model");
        Ok(())
    }

    /// Consume samples until the stream ends, then release both connections
    pub fn run(mut self) -> Result<RunSummary> {
        if !self.connected {
            return Err(SolverError::NotConnected);
        }

        let rule = SubscriptionRule::everything();
        info!("[SOLVER] installing subscription rule {:?}", rule);
        self.source.get_mut().add_rule(rule)?;

        let mut summary = RunSummary::default();
        summary.stop = loop {
            match self.source.get_mut().next_sample() {
                Ok(Some(sample)) => self.process(&sample, &mut summary),
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    warn!("[SOLVER] sample retrieval failed: {}", e);
                    break StopReason::SourceError(e.to_string());
                }
            }
        };

        info!("[SOLVER] No more samples available. Exiting.");
        self.source.release();
        self.sink.release();

        info!(
            "[SOLVER] processed {} samples, published {} attributes ({} failures)",
            summary.samples_processed, summary.attributes_published, summary.publish_failures
        );
        Ok(summary)
    }

    /// Run on a dedicated thread; the caller may join the handle or let it go
    pub fn start(self) -> Result<JoinHandle<Result<RunSummary>>>
    where
        S: 'static,
        K: 'static,
        D: 'static,
    {
        let handle = thread::Builder::new()
            .name("owl-solver".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn process(&mut self, sample: &Sample, summary: &mut RunSummary) {
        let attribute = self.deriver.derive(sample);
        summary.samples_processed += 1;

        match self.settings.publish_mode {
            PublishMode::Publish => match self.publish(&attribute) {
                Ok(()) => summary.attributes_published += 1,
                Err(e) => {
                    warn!(
                        "[SOLVER] failed to publish '{}' for {}: {}",
                        attribute.name, attribute.entity_id, e
                    );
                    summary.publish_failures += 1;
                }
            },
            PublishMode::LogOnly => {
                info!("{}: {:?}", attribute.entity_id, attribute);
            }
        }
    }

    fn publish(&mut self, attribute: &Attribute) -> Result<()> {
        if !self.announced.contains(&attribute.name) {
            return Err(SolverError::UnannouncedAttribute(attribute.name.clone()));
        }
        self.sink.get_mut().publish(attribute)
    }
}

fn as_connection_failure(collaborator: Collaborator, e: SolverError) -> SolverError {
    match e {
        SolverError::ConnectionFailed { .. } => e,
        other => SolverError::connection_failed(collaborator, other),
    }
}
