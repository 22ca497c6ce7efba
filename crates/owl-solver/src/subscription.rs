// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subscription rules gating which samples the aggregator delivers

use crate::sample::{PhysicalLayer, Sample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRule {
    /// Minimum spacing between samples per device, ms; 0 delivers every sample
    pub update_interval_ms: u64,
    pub physical_layer: PhysicalLayer,
}

impl SubscriptionRule {
    /// Every sample on every physical layer, no coalescing
    pub fn everything() -> Self {
        Self {
            update_interval_ms: 0,
            physical_layer: PhysicalLayer::All,
        }
    }

    pub fn admits(&self, sample: &Sample) -> bool {
        self.physical_layer.matches(sample.physical_layer)
    }
}

impl Default for SubscriptionRule {
    fn default() -> Self {
        Self::everything()
    }
}
