// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Newline-delimited JSON messages exchanged with the aggregator and world model
//!
//! One message per line, internally tagged by `type`:
//!
//! ```text
//! {"type":"handshake","protocol":"owl-aggregator","version":1}
//! {"type":"subscribe","rule":{"update_interval_ms":0,"physical_layer":0}}
//! {"type":"sample","sample":{"device_id":"0x2a","rssi":-55.0,"physical_layer":1,"timestamp_ms":1000}}
//! ```

use crate::attribute::{Attribute, AttributeSchema};
use crate::error::{Result, SolverError};
use crate::sample::Sample;
use crate::subscription::SubscriptionRule;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const AGGREGATOR_PROTOCOL: &str = "owl-aggregator";
pub const WORLD_MODEL_PROTOCOL: &str = "owl-world-model";
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregatorMessage {
    Handshake { protocol: String, version: u32 },
    Subscribe { rule: SubscriptionRule },
    SubscriptionAck { rule: SubscriptionRule },
    Sample { sample: Sample },
}

impl AggregatorMessage {
    pub fn handshake() -> Self {
        AggregatorMessage::Handshake {
            protocol: AGGREGATOR_PROTOCOL.to_string(),
            version: PROTOCOL_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldModelMessage {
    Handshake {
        protocol: String,
        version: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },
    AttributeAnnounce {
        origin: String,
        schemas: Vec<AttributeSchema>,
    },
    AttributeUpdate { attribute: Attribute },
}

impl WorldModelMessage {
    pub fn handshake(origin: &str) -> Self {
        WorldModelMessage::Handshake {
            protocol: WORLD_MODEL_PROTOCOL.to_string(),
            version: PROTOCOL_VERSION,
            origin: Some(origin.to_string()),
        }
    }
}

/// Check a peer's handshake fields
pub fn verify_handshake(expected: &str, protocol: &str, version: u32) -> Result<()> {
    if protocol != expected {
        return Err(SolverError::Protocol(format!(
            "expected protocol '{}', peer speaks '{}'",
            expected, protocol
        )));
    }
    if version != PROTOCOL_VERSION {
        return Err(SolverError::Protocol(format!(
            "unsupported {} version {} (want {})",
            protocol, version, PROTOCOL_VERSION
        )));
    }
    Ok(())
}

/// Serialize one message, newline-terminated
pub fn encode_line<M: Serialize>(message: &M) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line<M: DeserializeOwned>(line: &str) -> Result<M> {
    Ok(serde_json::from_str(line.trim())?)
}

pub async fn write_message<W, M>(writer: &mut W, message: &M) -> Result<()>
where
    W: AsyncWrite + Unpin,
    M: Serialize,
{
    let line = encode_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::encode_bool;
    use crate::sample::{DeviceId, PhysicalLayer};

    #[test]
    fn test_subscribe_wire_format() {
        let line = encode_line(&AggregatorMessage::Subscribe {
            rule: SubscriptionRule::everything(),
        })
        .unwrap();
        assert_eq!(
            line,
            "{\"type\":\"subscribe\",\"rule\":{\"update_interval_ms\":0,\"physical_layer\":0}}\n"
        );
    }

    #[test]
    fn test_decode_sample_line() {
        let line = r#"{"type":"sample","sample":{"device_id":"0x2a","rssi":-55.0,"physical_layer":1,"timestamp_ms":1000}}"#;
        match decode_line::<AggregatorMessage>(line).unwrap() {
            AggregatorMessage::Sample { sample } => {
                assert_eq!(sample.device_id, DeviceId(42));
                assert_eq!(sample.rssi, -55.0);
                assert_eq!(sample.physical_layer, PhysicalLayer::Pipsqueak);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_attribute_update_carries_payload_bytes() {
        let message = WorldModelMessage::AttributeUpdate {
            attribute: Attribute {
                name: "nearby".to_string(),
                entity_id: "0x2a".to_string(),
                creation_time_ms: 5,
                origin: "Example Solver".to_string(),
                payload: encode_bool(true),
            },
        };
        let line = encode_line(&message).unwrap();
        assert!(line.contains("\"type\":\"attribute_update\""));
        assert!(line.contains("\"payload\":[1]"));
        assert_eq!(decode_line::<WorldModelMessage>(&line).unwrap(), message);
    }

    #[test]
    fn test_server_handshake_without_origin() {
        let line = r#"{"type":"handshake","protocol":"owl-world-model","version":1}"#;
        let message: WorldModelMessage = decode_line(line).unwrap();
        assert_eq!(
            message,
            WorldModelMessage::Handshake {
                protocol: WORLD_MODEL_PROTOCOL.to_string(),
                version: 1,
                origin: None,
            }
        );
    }

    #[test]
    fn test_verify_handshake() {
        assert!(verify_handshake(AGGREGATOR_PROTOCOL, "owl-aggregator", 1).is_ok());
        assert!(verify_handshake(AGGREGATOR_PROTOCOL, "owl-world-model", 1).is_err());
        assert!(verify_handshake(AGGREGATOR_PROTOCOL, "owl-aggregator", 2).is_err());
    }

    #[test]
    fn test_malformed_line_is_json_error() {
        let err = decode_line::<AggregatorMessage>("{not json").unwrap_err();
        assert!(matches!(err, SolverError::Json(_)));
    }
}
