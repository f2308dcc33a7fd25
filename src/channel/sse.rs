//! Server-sent events transport.
//!
//! Events arrive on `GET /api/sessions/:id/events`; the SSE `event:` field
//! names the event and `data:` carries its JSON payload. Commands go out as
//! `POST /api/sessions/:id/<action>`.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use super::{PushChannel, SessionEventStream};
use crate::api::{segment, ApiClient};
use crate::errors::{ClientError, ClientResult};
use crate::poker::{SessionCommand, SessionEvent};

/// Push channel backed by the backend's SSE endpoint.
#[derive(Debug, Clone)]
pub struct SseChannel {
    api: ApiClient,
    session_id: String,
}

impl SseChannel {
    pub fn new(api: ApiClient, session_id: impl Into<String>) -> ClientResult<Self> {
        let session_id = segment("Session id", &session_id.into())?.to_string();
        Ok(Self { api, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl PushChannel for SseChannel {
    async fn subscribe(&self) -> ClientResult<SessionEventStream> {
        let url = self
            .api
            .url(&format!("/api/sessions/{}/events", self.session_id));

        let resp = self
            .api
            .http()
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_response_body(status, &body));
        }

        tracing::info!(session_id = %self.session_id, "Subscribed to session events");

        let events = resp
            .bytes_stream()
            .eventsource()
            .filter_map(|item| async move {
                match item {
                    Ok(event) => match SessionEvent::decode(&event.event, &event.data) {
                        Ok(Some(decoded)) => Some(Ok(decoded)),
                        Ok(None) => {
                            tracing::trace!(event = %event.event, "Skipping unknown push event");
                            None
                        }
                        Err(e) => {
                            tracing::warn!(event = %event.event, "Malformed push event: {}", e);
                            None
                        }
                    },
                    Err(e) => Some(Err(ClientError::Channel(format!("SSE stream error: {e}")))),
                }
            });

        Ok(Box::pin(events))
    }

    async fn send(&self, command: &SessionCommand) -> ClientResult<()> {
        if command.session_id() != self.session_id {
            return Err(ClientError::Channel(format!(
                "command for session {} sent on channel for {}",
                command.session_id(),
                self.session_id
            )));
        }

        let path = format!("/api/sessions/{}/{}", self.session_id, command.action());
        self.api.post_ack(&path, &command.body()).await
    }
}
