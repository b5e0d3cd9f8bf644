//! Acknowledgment bodies written back to vendors.

use crate::msg::IncomingMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire response: `{ "message", "data": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
    pub data: Vec<AckData>,
}

/// One entry of an acknowledgment, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AckData {
    Msg {
        channel_uuid: Uuid,
        msg_uuid: Uuid,
        text: String,
        urn: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
        received_on: DateTime<Utc>,
    },
    Info {
        info: String,
    },
    Error {
        error: String,
    },
}

impl AckResponse {
    /// Every accepted message is acknowledged.
    pub fn accepted(msgs: &[IncomingMessage]) -> Self {
        Self {
            message: "Message Accepted".to_string(),
            data: msgs
                .iter()
                .map(|m| AckData::Msg {
                    channel_uuid: m.channel_uuid,
                    msg_uuid: m.uuid,
                    text: m.text.clone(),
                    urn: m.urn.to_string(),
                    external_id: m.external_id.clone(),
                    received_on: m.received_on,
                })
                .collect(),
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            message: "Ignored".to_string(),
            data: vec![AckData::Info {
                info: reason.into(),
            }],
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            message: "Error".to_string(),
            data: vec![AckData::Error {
                error: error.into(),
            }],
        }
    }
}
