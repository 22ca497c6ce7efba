// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Physical-layer samples delivered by the aggregator

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque 128-bit device identifier
///
/// Displays as the short hex form used for world-model entity ids:
/// `0x` prefix, lower case, no leading zeros (`DeviceId(0x2a)` -> `"0x2a"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceId(pub u128);

impl DeviceId {
    /// Short hex encoding, stable for a given id
    pub fn to_hex_short(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u128> for DeviceId {
    fn from(id: u128) -> Self {
        Self(id)
    }
}

impl FromStr for DeviceId {
    type Err = String;

    /// Accepts `0x`-prefixed hex or plain decimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u128::from_str_radix(hex, 16),
            None => s.parse::<u128>(),
        };
        parsed
            .map(DeviceId)
            .map_err(|e| format!("invalid device id '{}': {}", s, e))
    }
}

// Carried as a hex string: JSON numbers cannot hold 128 bits portably.
impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_short())
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Radio technology a sample was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PhysicalLayer {
    /// Wildcard; only meaningful in subscription rules
    All,
    Pipsqueak,
    WiFi,
    Other(u8),
}

impl PhysicalLayer {
    /// True if a sample on `other` passes a filter set to `self`
    pub fn matches(&self, other: PhysicalLayer) -> bool {
        *self == PhysicalLayer::All || *self == other
    }
}

impl From<u8> for PhysicalLayer {
    fn from(code: u8) -> Self {
        match code {
            0 => PhysicalLayer::All,
            1 => PhysicalLayer::Pipsqueak,
            2 => PhysicalLayer::WiFi,
            other => PhysicalLayer::Other(other),
        }
    }
}

impl From<PhysicalLayer> for u8 {
    fn from(layer: PhysicalLayer) -> Self {
        match layer {
            PhysicalLayer::All => 0,
            PhysicalLayer::Pipsqueak => 1,
            PhysicalLayer::WiFi => 2,
            PhysicalLayer::Other(code) => code,
        }
    }
}

/// One observation of a transmitting device by a receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub device_id: DeviceId,
    #[serde(default)]
    pub receiver_id: DeviceId,
    /// Received signal strength, dBm
    pub rssi: f32,
    pub physical_layer: PhysicalLayer,
    /// Receiver timestamp, milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensed_data: Vec<u8>,
}

impl Sample {
    pub fn new(
        device_id: impl Into<DeviceId>,
        rssi: f32,
        physical_layer: PhysicalLayer,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            receiver_id: DeviceId::default(),
            rssi,
            physical_layer,
            timestamp_ms,
            sensed_data: Vec::new(),
        }
    }
}
