// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sample -> attribute derivation

use crate::attribute::{encode_bool, Attribute, AttributeSchema, SchemaSet};
use crate::sample::Sample;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_ATTRIBUTE_NAME: &str = "nearby";
pub const DEFAULT_RSSI_THRESHOLD: f32 = -60.0;
pub const DEFAULT_ORIGIN: &str = "Example Solver";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Pure mapping from one sample to one attribute
///
/// Implementations must be stateless: the same sample and clock value always
/// yield the same attribute.
pub trait AttributeDeriver: Send {
    /// Every attribute name this deriver can produce
    fn output_schemas(&self) -> SchemaSet;

    /// Derive with an explicit creation time
    fn derive_at(&self, sample: &Sample, now_ms: u64) -> Attribute;

    /// Derive stamped with the current wall-clock time
    fn derive(&self, sample: &Sample) -> Attribute {
        self.derive_at(sample, now_ms())
    }
}

/// Marks a device "nearby" when its RSSI is strictly above a threshold
#[derive(Debug, Clone)]
pub struct NearbyDeriver {
    attribute_name: String,
    threshold: f32,
    origin: String,
}

impl NearbyDeriver {
    pub fn new(attribute_name: impl Into<String>, threshold: f32, origin: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            threshold,
            origin: origin.into(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// `rssi == threshold` is not nearby
    pub fn is_nearby(&self, rssi: f32) -> bool {
        rssi > self.threshold
    }
}

impl Default for NearbyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_ATTRIBUTE_NAME, DEFAULT_RSSI_THRESHOLD, DEFAULT_ORIGIN)
    }
}

impl AttributeDeriver for NearbyDeriver {
    fn output_schemas(&self) -> SchemaSet {
        std::iter::once(AttributeSchema::streaming(self.attribute_name.clone())).collect()
    }

    fn derive_at(&self, sample: &Sample, now_ms: u64) -> Attribute {
        Attribute {
            name: self.attribute_name.clone(),
            entity_id: sample.device_id.to_hex_short(),
            creation_time_ms: now_ms,
            origin: self.origin.clone(),
            payload: encode_bool(self.is_nearby(sample.rssi)),
        }
    }
}
