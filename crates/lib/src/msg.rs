//! Canonical message model shared by every provider adapter.
//!
//! Channels, incoming/outgoing messages, delivery status and the per-request channel logs
//! attached to it. Plain data; adapters and the host fill these in.

use crate::transport::HttpTrace;
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Short provider code identifying a handler (e.g. "GL" for Globe Labs).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelType(String);

impl ChannelType {
    /// Channel types are case-insensitive on the wire and stored uppercase.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChannelType {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<ChannelType> for String {
    fn from(t: ChannelType) -> Self {
        t.0
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured vendor endpoint. Loaded by the host; read-only while a message is handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub uuid: Uuid,
    pub channel_type: ChannelType,
    /// ISO 3166 alpha-2 country code used to normalize local numbers.
    #[serde(default)]
    pub country: Option<String>,
    /// Vendor-assigned sending address (short code or number).
    pub address: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl Channel {
    /// Config value for `key`, trimmed; `None` when absent or blank.
    pub fn string_config(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Host-assigned id of an outgoing message.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(pub i64);

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized inbound message, handed to the backend as soon as it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub uuid: Uuid,
    pub channel_uuid: Uuid,
    pub urn: Urn,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub received_on: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &Channel, urn: Urn, text: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            channel_uuid: channel.uuid,
            urn,
            text: text.into(),
            external_id: None,
            received_on: Utc::now(),
        }
    }

    /// Sets the vendor id; blank ids are treated as missing.
    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_id = external_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_received_on(mut self, received_on: DateTime<Utc>) -> Self {
        self.received_on = received_on;
        self
    }
}

/// A message the host wants delivered through a channel.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub id: MsgId,
    pub channel: Arc<Channel>,
    pub urn: Urn,
    pub text: String,
    /// Media as `content-type:url`; a bare URL is accepted too.
    pub attachments: Vec<String>,
}

impl OutgoingMessage {
    /// Text followed by each attachment URL on its own line, for SMS-only vendors.
    pub fn text_and_attachments(&self) -> String {
        let mut out = self.text.clone();
        for attachment in &self.attachments {
            out.push('\n');
            out.push_str(attachment_url(attachment));
        }
        out
    }
}

fn attachment_url(attachment: &str) -> &str {
    match attachment.split_once(':') {
        Some((content_type, url)) if content_type.contains('/') => url,
        _ => attachment,
    }
}

/// Delivery state of an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgStatusValue {
    /// No segment reached the vendor.
    Errored,
    /// Accepted by the vendor transport; says nothing about handset delivery.
    Wired,
}

/// Record of one HTTP exchange with a vendor (or its failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLog {
    pub description: String,
    pub channel_uuid: Uuid,
    pub msg_id: Option<MsgId>,
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub request: String,
    pub response: String,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub created_on: DateTime<Utc>,
}

impl ChannelLog {
    /// Log entry for one request; attach a failure with [`ChannelLog::with_error`].
    pub fn from_trace(
        description: &str,
        channel: &Channel,
        msg_id: Option<MsgId>,
        trace: HttpTrace,
    ) -> Self {
        Self {
            description: description.to_string(),
            channel_uuid: channel.uuid,
            msg_id,
            method: trace.method,
            url: trace.url,
            status_code: trace.status_code,
            request: trace.request,
            response: trace.response,
            error: None,
            elapsed_ms: trace.elapsed_ms,
            created_on: Utc::now(),
        }
    }

    /// Records `error` as "`label`: `error`".
    pub fn with_error(mut self, label: &str, error: impl fmt::Display) -> Self {
        self.error = Some(format!("{}: {}", label, error));
        self
    }
}

/// Accumulates the outcome of one send. Mutated only by the flow performing that send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgStatus {
    pub channel_uuid: Uuid,
    pub msg_id: MsgId,
    pub status: MsgStatusValue,
    pub logs: Vec<ChannelLog>,
}

impl MsgStatus {
    pub fn new(channel: &Channel, msg_id: MsgId, status: MsgStatusValue) -> Self {
        Self {
            channel_uuid: channel.uuid,
            msg_id,
            status,
            logs: Vec::new(),
        }
    }

    pub fn set_status(&mut self, status: MsgStatusValue) {
        self.status = status;
    }

    pub fn add_log(&mut self, log: ChannelLog) {
        self.logs.push(log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        let mut config = BTreeMap::new();
        config.insert("app_id".to_string(), "  my-app ".to_string());
        config.insert("passphrase".to_string(), "   ".to_string());
        Channel {
            uuid: Uuid::new_v4(),
            channel_type: ChannelType::new("gl"),
            country: Some("PH".to_string()),
            address: "21581234".to_string(),
            config,
        }
    }

    #[test]
    fn channel_type_is_uppercased() {
        assert_eq!(ChannelType::new(" gl ").as_str(), "GL");
    }

    #[test]
    fn string_config_trims_and_skips_blank() {
        let c = channel();
        assert_eq!(c.string_config("app_id"), Some("my-app"));
        assert_eq!(c.string_config("passphrase"), None);
        assert_eq!(c.string_config("app_secret"), None);
    }

    #[test]
    fn blank_external_id_is_none() {
        let c = channel();
        let urn = Urn::tel_for_country("+639171234567", Some("PH"));
        let msg = IncomingMessage::new(&c, urn, "hi").with_external_id(Some(String::new()));
        assert_eq!(msg.external_id, None);
        assert_eq!(msg.channel_uuid, c.uuid);
    }

    #[test]
    fn log_error_uses_its_own_label() {
        let c = channel();
        let entry = ChannelLog::from_trace("Message Sent", &c, Some(MsgId(3)), HttpTrace::default());
        assert_eq!(entry.error, None);
        let entry = entry.with_error("Message Send Error", "timed out");
        assert_eq!(entry.description, "Message Sent");
        assert_eq!(entry.error.as_deref(), Some("Message Send Error: timed out"));
    }

    #[test]
    fn attachments_appended_as_lines() {
        let msg = OutgoingMessage {
            id: MsgId(1),
            channel: Arc::new(channel()),
            urn: Urn::tel_for_country("+639171234567", Some("PH")),
            text: "See this".to_string(),
            attachments: vec![
                "image/jpeg:https://example.com/a.jpg".to_string(),
                "https://example.com/b.pdf".to_string(),
            ],
        };
        assert_eq!(
            msg.text_and_attachments(),
            "See this\nhttps://example.com/a.jpg\nhttps://example.com/b.pdf"
        );
    }

    #[test]
    fn status_value_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MsgStatusValue::Wired).unwrap(),
            "\"wired\""
        );
    }
}
