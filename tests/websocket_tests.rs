//! WebSocket event feed integration tests

use std::net::SocketAddr;
use std::time::Duration;

use charge_handover::models::{CreateHandoverRequest, Decision, DecisionRequest};
use futures::StreamExt;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

mod common;

use common::{create_body, setup_app, TestApp};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve(t: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = t.app.clone();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

async fn connect(addr: SocketAddr, token: &str) -> WsStream {
    let url = format!("ws://{}/ws?token={}", addr, token);
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    let hello = next_json(&mut ws).await.expect("no connected message");
    assert_eq!(hello["type"], "connected");
    ws
}

/// Next text frame as JSON, or None if nothing arrives in time
async fn next_json(ws: &mut WsStream) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_millis(500), ws.next())
            .await
            .ok()??
            .ok()?;
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).ok();
        }
    }
}

fn payload(t: &TestApp) -> CreateHandoverRequest {
    serde_json::from_value(create_body(&t.people.receiver)).unwrap()
}

#[tokio::test]
async fn test_rejects_missing_token() {
    let t = setup_app().await;
    let addr = serve(&t).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_rejects_bad_token() {
    let t = setup_app().await;
    let addr = serve(&t).await;

    let result =
        tokio_tungstenite::connect_async(format!("ws://{}/ws?token=not-a-jwt", addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_head_sees_created_and_decided() {
    let t = setup_app().await;
    let addr = serve(&t).await;
    let mut ws = connect(addr, &t.token(&t.people.hod)).await;

    let created = t
        .state
        .service
        .create(payload(&t), &t.people.sender)
        .await
        .unwrap();

    let event = next_json(&mut ws).await.expect("no created event");
    assert_eq!(event["type"], "handover_created");
    assert_eq!(event["handover"]["id"], created.handover.id.to_string());
    assert_eq!(event["handover"]["status"], "pending_hod");

    t.state
        .service
        .decide_head(
            created.handover.id,
            &t.people.hod,
            DecisionRequest {
                decision: Decision::Approved,
                remarks: None,
            },
        )
        .await
        .unwrap();

    let event = next_json(&mut ws).await.expect("no decided event");
    assert_eq!(event["type"], "handover_decided");
    assert_eq!(event["stage"], "head");
    assert_eq!(event["decision"], "approved");
    assert_eq!(event["handover"]["status"], "pending_faculty");
}

#[tokio::test]
async fn test_unrelated_user_sees_nothing() {
    let t = setup_app().await;
    let addr = serve(&t).await;
    let mut ws = connect(addr, &t.token(&t.people.other_hod)).await;

    t.state
        .service
        .create(payload(&t), &t.people.sender)
        .await
        .unwrap();

    assert!(next_json(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_receiver_heading_another_department_gets_events() {
    let t = setup_app().await;
    let addr = serve(&t).await;
    let mut ws = connect(addr, &t.token(&t.people.other_hod)).await;

    let payload: CreateHandoverRequest =
        serde_json::from_value(create_body(&t.people.other_hod)).unwrap();
    let created = t
        .state
        .service
        .create(payload, &t.people.principal)
        .await
        .unwrap();

    let event = next_json(&mut ws).await.expect("no created event");
    assert_eq!(event["type"], "handover_created");
    assert_eq!(event["handover"]["id"], created.handover.id.to_string());
}
