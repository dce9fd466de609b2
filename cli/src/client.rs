//! HTTP and WebSocket client for the handover service

use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use uuid::Uuid;

use crate::messages::{
    Claims, CreateHandover, DecisionBody, ErrorBody, FeedMessage, Handover, HandoverView,
};

/// Sign a development token with the server's shared secret
pub fn mint_token(secret: &str, claims: &Claims) -> Result<String> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Client bound to one server and one identity
pub struct HandoverClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl HandoverClient {
    pub fn new(server: &str, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(server)?,
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Sent and received handovers of the token's identity
    pub async fn list(&self) -> Result<HandoverView> {
        let response = self
            .http
            .get(self.endpoint("/handovers"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn create(&self, payload: &CreateHandover) -> Result<Handover> {
        let response = self
            .http
            .post(self.endpoint("/handovers"))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        parse(response).await
    }

    /// Decide a stage; `action` is `approve-hod`, `approve-faculty` or `decision`
    pub async fn decide(&self, id: Uuid, action: &str, body: &DecisionBody) -> Result<Handover> {
        let response = self
            .http
            .put(self.endpoint(&format!("/handovers/{}/{}", id, action)))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        parse(response).await
    }

    /// WebSocket URL of the event feed
    pub fn feed_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("Cannot derive a WebSocket URL from {}", self.base_url))?;
        url.set_path("/ws");
        url.query_pairs_mut().clear().append_pair("token", &self.token);
        Ok(url)
    }

    /// Follow the event feed until `on_event` returns false or the server closes
    pub async fn watch<F>(&self, mut on_event: F) -> Result<()>
    where
        F: FnMut(FeedMessage) -> bool,
    {
        let url = self.feed_url()?;
        tracing::info!("Connecting to {}", url.host_str().unwrap_or_default());

        let (mut ws_stream, _) = connect_async(url.as_str()).await?;

        while let Some(result) = ws_stream.next().await {
            match result? {
                Message::Text(text) => match serde_json::from_str::<FeedMessage>(&text) {
                    Ok(msg) => {
                        if !on_event(msg) {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to parse message: {} - {}", e, text),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => {
            let mut message = format!("{} ({}): {}", status, body.code, body.message);
            for (field, problem) in &body.field_errors {
                message.push_str(&format!("\n  {}: {}", field, problem));
            }
            bail!(message)
        }
        Err(_) => bail!("{}: {}", status, text),
    }
}
