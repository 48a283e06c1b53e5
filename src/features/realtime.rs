//! Real-time sessions.
//!
//! A session is created over HTTP, then driven over a WebSocket. Server frames are JSON
//! events of type `message`, `error` or `ping`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::executor::RequestExecutor;
use crate::http::{BETA_HEADER, ORGANIZATION_HEADER};
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTimeSession {
    pub id: String,
    pub status: SessionStatus,
    /// Epoch seconds.
    #[serde(default)]
    pub created_at: u64,
    /// Epoch seconds.
    #[serde(default)]
    pub expires_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session: RealTimeSession,
    /// WebSocket URL to connect to.
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTimeMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RealTimeMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Message,
    Error,
    Ping,
}

/// A server event frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTimeEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub message: Option<RealTimeMessage>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(default)]
    pub code: String,
    pub message: String,
}

/// Receives the events of a running connection. See [`RealTimeConnection::run`].
pub trait RealTimeSessionDelegate: Send {
    fn on_message(&mut self, session: &RealTimeSession, message: RealTimeMessage);

    fn on_error(&mut self, session: &RealTimeSession, error: ClientError);

    fn on_status_change(&mut self, session: &RealTimeSession, status: SessionStatus);
}

/// An open WebSocket to a real-time session.
pub struct RealTimeConnection {
    session: RealTimeSession,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for RealTimeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealTimeConnection")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl RealTimeConnection {
    pub fn session(&self) -> &RealTimeSession {
        &self.session
    }

    /// Send a message as a JSON text frame.
    pub async fn send(&mut self, message: &RealTimeMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(message).map_err(ClientError::Encoding)?;
        self.socket.send(Message::text(text)).await?;
        Ok(())
    }

    /// Wait for the next message.
    ///
    /// Pings and binary frames are skipped. A server `error` event yields
    /// [`ClientError::Server`], a frame that is not a valid event yields
    /// [`ClientError::Decoding`] and a `message` event without a body yields
    /// [`ClientError::InvalidResponse`]; reading can continue after any of them. `None` means the
    /// socket closed.
    pub async fn next_event(&mut self) -> Option<Result<RealTimeMessage, ClientError>> {
        loop {
            let text = match self.socket.next().await? {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            };

            let event: RealTimeEvent = match serde_json::from_str(text.as_str()) {
                Ok(event) => event,
                Err(e) => return Some(Err(ClientError::Decoding(e))),
            };

            match event.event_type {
                EventType::Message => {
                    return Some(event.message.ok_or_else(|| {
                        debug!(session = %self.session.id, "Message event without a message");
                        ClientError::InvalidResponse
                    }));
                }
                EventType::Error => {
                    let message = event
                        .error
                        .map(|error| error.message)
                        .unwrap_or_else(|| "unspecified server error".to_string());
                    return Some(Err(ClientError::Server(message)));
                }
                EventType::Ping => debug!(session = %self.session.id, "Real-time ping"),
            }
        }
    }

    /// Forward events to a delegate until the socket closes, fails or `cancel` fires.
    ///
    /// The delegate sees `Active` first and `Expired` last. Server and decoding errors are
    /// reported and reading continues; a socket error is reported and ends the run.
    pub async fn run<D>(mut self, delegate: &mut D, cancel: &CancellationToken)
    where
        D: RealTimeSessionDelegate + ?Sized,
    {
        delegate.on_status_change(&self.session, SessionStatus::Active);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.next_event() => next,
            };

            match next {
                Some(Ok(message)) => delegate.on_message(&self.session, message),
                Some(Err(e)) => {
                    let fatal = matches!(e, ClientError::WebSocket(_));
                    delegate.on_error(&self.session, e);
                    if fatal {
                        break;
                    }
                }
                None => break,
            }
        }

        let session = self.session.clone();
        if let Err(e) = self.disconnect().await {
            debug!(session = %session.id, error = %e, "Close handshake failed");
        }
        delegate.on_status_change(&session, SessionStatus::Expired);
    }

    /// Close the socket.
    pub async fn disconnect(mut self) -> Result<(), ClientError> {
        match self.socket.close(None).await {
            Ok(())
            | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
pub trait RealTimeApi: Send + Sync {
    /// Create a session and get the URL to connect to.
    async fn create(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ClientError>;

    /// Open a WebSocket to a session.
    async fn connect(
        &self,
        session: RealTimeSession,
        url: &str,
    ) -> Result<RealTimeConnection, ClientError>;
}

/// [`RealTimeApi`] over HTTP and WebSocket. Requests carry `OpenAI-Beta: realtime=v1`.
#[derive(Debug, Clone)]
pub struct RealTimeEndpoint {
    executor: Arc<RequestExecutor>,
}

impl RealTimeEndpoint {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl RealTimeApi for RealTimeEndpoint {
    async fn create(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ClientError> {
        self.executor
            .request(&Endpoint::RealTimeSessions, Some(request))
            .await
    }

    async fn connect(
        &self,
        session: RealTimeSession,
        url: &str,
    ) -> Result<RealTimeConnection, ClientError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;

        let options = self.executor.options();
        let api_key = &options.api_key;
        if api_key.is_blank() {
            return Err(ClientError::InvalidCredentials);
        }
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| ClientError::InvalidCredentials)?;
        bearer.set_sensitive(true);

        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        if let Some(beta) = Endpoint::RealTimeSessions.beta_header() {
            headers.insert(handshake_header_name(BETA_HEADER)?, HeaderValue::from_static(beta));
        }
        if let Some(organization) = &options.organization {
            headers.insert(
                handshake_header_name(ORGANIZATION_HEADER)?,
                handshake_header_value(organization)?,
            );
        }
        for (key, value) in options.extra_headers.iter().flatten() {
            headers.insert(handshake_header_name(key)?, handshake_header_value(value)?);
        }

        let (socket, response) = connect_async(request).await.inspect_err(|e| {
            warn!(session = %session.id, error = %e, "Real-time connection failed");
        })?;
        debug!(session = %session.id, status = response.status().as_u16(), "Real-time connected");

        Ok(RealTimeConnection { session, socket })
    }
}

fn handshake_header_name(name: &str) -> Result<HeaderName, ClientError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::Config(format!("invalid header name {name}: {e}")))
}

fn handshake_header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::Config(format!("invalid header value {value}: {e}")))
}
