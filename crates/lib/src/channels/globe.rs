//! Globe Labs (channel type `GL`): inbound SMS webhook and outbound SMS API.
//!
//! Inbound: Globe POSTs `{"inboundSMSMessageList":{"inboundSMSMessage":[...]}}` to
//! `/c/gl/{uuid}/receive`. A batch is accepted only if every entry validates.
//! Outbound: one JSON POST per 160-char segment to the per-address send URL.

use crate::backend::Backend;
use crate::channels::error::{ReceiveError, SendError};
use crate::channels::inbound::ReceiveOutcome;
use crate::channels::registry::{ChannelHandler, HandlerRoute};
use crate::msg::{
    Channel, ChannelLog, ChannelType, IncomingMessage, MsgStatus, MsgStatusValue, OutgoingMessage,
};
use crate::split::split_msg;
use crate::transport::{HttpRequest, Transport};
use crate::urn::Urn;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CHANNEL_TYPE: &str = "GL";
pub const DEFAULT_SEND_URL: &str =
    "https://devapi.globelabs.com.ph/smsmessaging/v1/outbound/{address}/requests";
pub const DEFAULT_MAX_MSG_LENGTH: usize = 160;

pub const CONFIG_PASSPHRASE: &str = "passphrase";
pub const CONFIG_APP_SECRET: &str = "app_secret";
pub const CONFIG_APP_ID: &str = "app_id";

/// e.g. "Fri Nov 22 2013 12:12:13 GMT+0000 (UTC)"
const DATE_LAYOUT: &str = "%a %b %d %Y %H:%M:%S GMT%z (UTC)";
const TEL_PREFIX: &str = "tel:";
const SEND_LOG_DESCRIPTION: &str = "Message Sent";
const SEND_ERROR_LABEL: &str = "Message Send Error";

/// Per-deployment knobs for the Globe handler.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSettings {
    /// Send URL template; `{address}` is replaced by the channel address.
    pub send_url: String,
    pub max_msg_length: usize,
    /// Also treat a 2xx reply whose body carries an `error` member as a failed segment.
    pub strict_response: bool,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            send_url: DEFAULT_SEND_URL.to_string(),
            max_msg_length: DEFAULT_MAX_MSG_LENGTH,
            strict_response: false,
        }
    }
}

impl GlobeSettings {
    fn send_url_for(&self, address: &str) -> String {
        self.send_url.replace("{address}", address)
    }
}

/// Missing or `null` lists decode as an empty batch.
#[derive(Debug, Deserialize)]
struct MoPayload {
    #[serde(rename = "inboundSMSMessageList", default)]
    inbound_sms_message_list: Option<MoMessageList>,
}

impl MoPayload {
    fn into_entries(self) -> Vec<MoMessage> {
        self.inbound_sms_message_list
            .and_then(|list| list.inbound_sms_message)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct MoMessageList {
    #[serde(rename = "inboundSMSMessage", default)]
    inbound_sms_message: Option<Vec<MoMessage>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoMessage {
    date_time: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message: String,
    sender_address: String,
}

/// Outbound request body.
#[derive(Debug, Serialize)]
struct MtPayload<'a> {
    address: &'a str,
    message: &'a str,
    passphrase: &'a str,
    app_id: &'a str,
    app_secret: &'a str,
}

/// Credentials a channel must carry before anything is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeCredentials {
    pub app_id: String,
    pub app_secret: String,
    pub passphrase: String,
}

impl GlobeCredentials {
    pub fn from_channel(channel: &Channel) -> Result<Self, SendError> {
        let require = |key: &'static str| {
            channel
                .string_config(key)
                .map(str::to_string)
                .ok_or_else(|| SendError::MissingConfig {
                    key,
                    channel_type: CHANNEL_TYPE.to_string(),
                })
        };
        Ok(Self {
            app_id: require(CONFIG_APP_ID)?,
            app_secret: require(CONFIG_APP_SECRET)?,
            passphrase: require(CONFIG_PASSPHRASE)?,
        })
    }
}

/// Build the request for one segment. `address` is the destination without a leading `+`.
pub fn build_request(
    url: &str,
    address: &str,
    segment: &str,
    creds: &GlobeCredentials,
) -> Result<HttpRequest, serde_json::Error> {
    let body = serde_json::to_string(&MtPayload {
        address,
        message: segment,
        passphrase: &creds.passphrase,
        app_id: &creds.app_id,
        app_secret: &creds.app_secret,
    })?;
    Ok(HttpRequest::post(url)
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .body(body))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, ReceiveError> {
    DateTime::parse_from_str(s, DATE_LAYOUT)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ReceiveError::validation(format!("invalid 'dateTime' parameter '{}': {}", s, e)))
}

fn to_incoming(channel: &Channel, mo: MoMessage) -> Result<IncomingMessage, ReceiveError> {
    let received_on = parse_date(&mo.date_time)?;
    let number = mo
        .sender_address
        .strip_prefix(TEL_PREFIX)
        .ok_or_else(|| ReceiveError::validation("invalid 'senderAddress' parameter"))?;
    let urn = Urn::tel_for_country(number, channel.country.as_deref());
    Ok(IncomingMessage::new(channel, urn, mo.message)
        .with_external_id(mo.message_id)
        .with_received_on(received_on))
}

/// Top-level `error` member of a vendor reply, if any.
fn vendor_error(response: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(response).ok()?;
    match value.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(format!("vendor reported error: {}", s)),
        other => Some(format!("vendor reported error: {}", other)),
    }
}

/// Globe Labs handler. Backend and transport are supplied by the host.
pub struct GlobeHandler {
    backend: Arc<dyn Backend>,
    transport: Arc<dyn Transport>,
    settings: GlobeSettings,
}

impl GlobeHandler {
    pub fn new(
        backend: Arc<dyn Backend>,
        transport: Arc<dyn Transport>,
        settings: GlobeSettings,
    ) -> Self {
        Self {
            backend,
            transport,
            settings,
        }
    }

    /// Parse a webhook body, validate every entry, then persist them in order.
    pub async fn receive_message(
        &self,
        channel: &Channel,
        body: &[u8],
    ) -> Result<ReceiveOutcome, ReceiveError> {
        let payload: MoPayload = serde_json::from_slice(body)?;
        let entries = payload.into_entries();
        if entries.is_empty() {
            log::debug!("globe {}: empty inbound batch", channel.uuid);
            return Ok(ReceiveOutcome::ignored("no messages, ignored"));
        }

        // validate the whole batch before touching the backend
        let msgs = entries
            .into_iter()
            .map(|mo| to_incoming(channel, mo))
            .collect::<Result<Vec<_>, _>>()?;

        for msg in &msgs {
            self.backend
                .write_incoming_msg(msg)
                .await
                .map_err(ReceiveError::Persistence)?;
        }
        log::info!("globe {}: accepted {} message(s)", channel.uuid, msgs.len());
        Ok(ReceiveOutcome::Accepted(msgs))
    }

    /// Send every segment of `msg` in order. The status is `Wired` once any segment gets
    /// through; failures are logged on the status and never stop later segments.
    pub async fn send_msg(&self, msg: &OutgoingMessage) -> Result<MsgStatus, SendError> {
        let channel = msg.channel.as_ref();
        let creds = GlobeCredentials::from_channel(channel)?;
        let url = self.settings.send_url_for(&channel.address);
        let path = msg.urn.path();
        let address = path.strip_prefix('+').unwrap_or(path);

        let requests = split_msg(&msg.text_and_attachments(), self.settings.max_msg_length)
            .iter()
            .map(|part| build_request(&url, address, part, &creds))
            .collect::<Result<Vec<_>, _>>()
            .map_err(SendError::Encode)?;

        let mut status = self
            .backend
            .new_msg_status(channel, msg.id, MsgStatusValue::Errored);
        for (i, req) in requests.iter().enumerate() {
            let (trace, mut error) = match self.transport.perform(req).await {
                Ok(trace) => (trace, None),
                Err(failure) => (failure.trace, Some(failure.error.to_string())),
            };
            if error.is_none() && self.settings.strict_response {
                error = vendor_error(&trace.response);
            }
            let entry = ChannelLog::from_trace(SEND_LOG_DESCRIPTION, channel, Some(msg.id), trace);
            match error {
                None => {
                    status.add_log(entry);
                    status.set_status(MsgStatusValue::Wired);
                }
                Some(e) => {
                    log::warn!(
                        "globe {}: segment {}/{} of message {} failed: {}",
                        channel.uuid,
                        i + 1,
                        requests.len(),
                        msg.id,
                        e
                    );
                    status.add_log(entry.with_error(SEND_ERROR_LABEL, e));
                }
            }
        }
        Ok(status)
    }
}

#[async_trait]
impl ChannelHandler for GlobeHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::new(CHANNEL_TYPE)
    }

    fn name(&self) -> &str {
        "Globe Labs"
    }

    fn routes(&self) -> Vec<HandlerRoute> {
        vec![HandlerRoute {
            method: "POST",
            action: "receive",
        }]
    }

    async fn receive(
        &self,
        channel: &Channel,
        action: &str,
        body: &[u8],
    ) -> Result<ReceiveOutcome, ReceiveError> {
        match action {
            "receive" => self.receive_message(channel, body).await,
            other => Err(ReceiveError::validation(format!("unknown action '{}'", other))),
        }
    }

    async fn send(&self, msg: &OutgoingMessage) -> Result<MsgStatus, SendError> {
        self.send_msg(msg).await
    }
}
