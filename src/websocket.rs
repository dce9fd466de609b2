//! WebSocket feed of handover events
//!
//! Clients authenticate with `?token=<jwt>` (browsers cannot set headers on
//! WebSocket requests) or a bearer header, and receive the events for
//! handovers they are allowed to see.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::error::Result;
use crate::handover::{visibility, HandoverEvent, Stage};
use crate::identity::Identity;
use crate::models::{Decision, HandoverResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub token: Option<String>,
}

/// Messages from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription is live
    Connected { identity_id: Uuid },
    /// A visible handover was submitted
    HandoverCreated { handover: HandoverResponse },
    /// A stage of a visible handover was decided
    HandoverDecided {
        stage: Stage,
        decision: Decision,
        handover: HandoverResponse,
    },
    /// The client fell behind and missed events; it should re-fetch
    Lagged { missed: u64 },
}

impl From<HandoverEvent> for ServerMessage {
    fn from(event: HandoverEvent) -> Self {
        match event {
            HandoverEvent::Created { handover } => ServerMessage::HandoverCreated { handover },
            HandoverEvent::Decided {
                stage,
                decision,
                handover,
            } => ServerMessage::HandoverDecided {
                stage,
                decision,
                handover,
            },
        }
    }
}

/// WebSocket handler
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let identity = match params.token.as_deref() {
        Some(token) => state.auth.authenticate(token)?,
        None => state.auth.authenticate_headers(&headers)?,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.service.subscribe();
    let receiver_match = state.service.receiver_match();

    tracing::debug!(identity_id = %identity.id, "Event feed connected");

    if send(&mut sender, &ServerMessage::Connected {
        identity_id: identity.id,
    })
    .await
    .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            },
            event = events.recv() => {
                let outgoing = match event {
                    Ok(event) => {
                        if !visibility::can_view(event.handover(), &identity, receiver_match) {
                            continue;
                        }
                        ServerMessage::from(event)
                    }
                    Err(RecvError::Lagged(missed)) => ServerMessage::Lagged { missed },
                    Err(RecvError::Closed) => break,
                };
                if send(&mut sender, &outgoing).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(identity_id = %identity.id, "Event feed disconnected");
}

async fn send(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> std::result::Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
            return Ok(());
        }
    };

    sender.send(Message::Text(json)).await.map_err(|e| {
        tracing::debug!("Failed to send event: {}", e);
    })
}
