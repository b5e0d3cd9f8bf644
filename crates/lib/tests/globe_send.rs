//! Integration test: send through the Globe handler with the real reqwest transport against a
//! local stand-in for the Globe outbound API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use smsgate::backend::MemoryBackend;
use smsgate::channels::{GlobeHandler, GlobeSettings};
use smsgate::msg::{Channel, ChannelType, MsgId, MsgStatusValue, OutgoingMessage};
use smsgate::transport::ReqwestTransport;
use smsgate::urn::Urn;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Default)]
struct Vendor {
    calls: Arc<AtomicUsize>,
    /// Requests whose (1-based) index is listed here get a 500.
    fail_calls: Arc<Vec<usize>>,
    received: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

async fn outbound(
    State(vendor): State<Vendor>,
    Path(address): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let n = vendor.calls.fetch_add(1, Ordering::SeqCst) + 1;
    vendor.received.lock().expect("lock").push((address, body));
    if vendor.fail_calls.contains(&n) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "unavailable" })),
        );
    }
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "outboundSMSMessageRequest": { "address": "tel:+63" } })),
    )
}

/// Starts the stand-in vendor and returns its send URL template.
async fn start_vendor(vendor: Vendor) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind vendor");
    let port = listener.local_addr().expect("local_addr").port();
    let app = Router::new()
        .route("/smsmessaging/v1/outbound/:address/requests", post(outbound))
        .with_state(vendor);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!(
        "http://127.0.0.1:{}/smsmessaging/v1/outbound/{{address}}/requests",
        port
    )
}

fn channel() -> Channel {
    let mut config = BTreeMap::new();
    config.insert("app_id".to_string(), "A".to_string());
    config.insert("app_secret".to_string(), "S".to_string());
    config.insert("passphrase".to_string(), "P".to_string());
    Channel {
        uuid: Uuid::new_v4(),
        channel_type: ChannelType::new("GL"),
        country: Some("PH".to_string()),
        address: "21581234".to_string(),
        config,
    }
}

fn handler(send_url: String) -> GlobeHandler {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).expect("transport");
    GlobeHandler::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(transport),
        GlobeSettings {
            send_url,
            ..GlobeSettings::default()
        },
    )
}

fn message(text: String) -> OutgoingMessage {
    OutgoingMessage {
        id: MsgId(42),
        channel: Arc::new(channel()),
        urn: Urn::tel_for_country("09171234567", Some("PH")),
        text,
        attachments: Vec::new(),
    }
}

#[tokio::test]
async fn long_message_is_sent_in_order() {
    let vendor = Vendor::default();
    let url = start_vendor(vendor.clone()).await;
    let text = format!("{} {}", "a".repeat(150), "b".repeat(20));

    let status = handler(url).send_msg(&message(text.clone())).await.expect("send");
    assert_eq!(status.status, MsgStatusValue::Wired);
    assert_eq!(status.logs.len(), 2);
    assert!(status.logs.iter().all(|l| l.status_code == Some(201)));

    let received = vendor.received.lock().expect("lock").clone();
    assert_eq!(received.len(), 2);
    let joined: String = received
        .iter()
        .map(|(_, body)| body["message"].as_str().expect("message").to_string())
        .collect();
    assert_eq!(joined, text);
    for (address, body) in &received {
        assert_eq!(address, "21581234");
        assert_eq!(body["address"], "639171234567");
        assert_eq!(body["app_id"], "A");
        assert_eq!(body["app_secret"], "S");
        assert_eq!(body["passphrase"], "P");
    }
}

#[tokio::test]
async fn server_error_on_first_segment_still_wired() {
    let vendor = Vendor {
        fail_calls: Arc::new(vec![1]),
        ..Vendor::default()
    };
    let url = start_vendor(vendor.clone()).await;

    let status = handler(url)
        .send_msg(&message("c".repeat(161)))
        .await
        .expect("send");
    assert_eq!(status.status, MsgStatusValue::Wired);
    assert_eq!(status.logs.len(), 2);
    assert_eq!(status.logs[0].status_code, Some(500));
    assert_eq!(
        status.logs[0].error.as_deref(),
        Some("Message Send Error: received non 200 response: 500")
    );
    assert!(status.logs[0].response.contains("unavailable"));
    assert_eq!(status.logs[1].error, None);
}

#[tokio::test]
async fn every_segment_failing_is_errored() {
    let vendor = Vendor {
        fail_calls: Arc::new(vec![1, 2]),
        ..Vendor::default()
    };
    let url = start_vendor(vendor.clone()).await;

    let status = handler(url)
        .send_msg(&message("d".repeat(200)))
        .await
        .expect("send");
    assert_eq!(status.status, MsgStatusValue::Errored);
    assert_eq!(status.logs.len(), 2);
    assert_eq!(vendor.calls.load(Ordering::SeqCst), 2);
}
