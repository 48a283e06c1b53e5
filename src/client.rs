//! Top-level client and error types.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use thiserror::Error;

use crate::executor::RequestExecutor;
use crate::features::{AssistantsEndpoint, ChatEndpoint, EmbeddingsEndpoint, RealTimeEndpoint};
use crate::options::ClientOptions;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The response was invalid")]
    InvalidResponse,

    #[error("HTTP error {status}")]
    Http { status: u16, body: String },

    #[error("Rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<SystemTime> },

    #[error("Failed to decode response: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("Failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("The API key is missing or invalid")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("The request timed out")]
    Timeout,

    #[error("Connection closed before the stream finished")]
    ConnectionClosed,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Server error: {0}")]
    Server(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

fn reset_suffix(reset_at: &Option<SystemTime>) -> String {
    reset_at
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| format!(". Try again after {} (epoch seconds)", d.as_secs()))
        .unwrap_or_default()
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Network(e)
        }
    }
}

impl ClientError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the credentials were rejected, either locally or by the server.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidCredentials | ClientError::Http { status: 401, .. }
        )
    }

    /// Whether the request executor may try again after this error.
    pub fn is_retryable(&self) -> bool {
        if self.is_invalid_credentials() {
            return false;
        }
        !matches!(
            self,
            ClientError::InvalidUrl(_)
                | ClientError::Config(_)
                | ClientError::Encoding(_)
                | ClientError::Cancelled
        )
    }

    /// Whether the error came from the transport rather than the API.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_)
                | ClientError::Timeout
                | ClientError::ConnectionClosed
                | ClientError::WebSocket(_)
        )
    }

    /// Parse the structured error payload out of an HTTP error body.
    ///
    /// ```
    /// use openai_kit::ClientError;
    ///
    /// let err = ClientError::Http {
    ///     status: 400,
    ///     body: r#"{"error":{"message":"bad","type":"invalid_request_error","code":null}}"#.into(),
    /// };
    /// assert_eq!(err.api_error().unwrap().message, "bad");
    /// ```
    pub fn api_error(&self) -> Option<ApiError> {
        match self {
            ClientError::Http { body, .. } => serde_json::from_str::<ApiErrorResponse>(body)
                .ok()
                .map(|r| r.error),
            _ => None,
        }
    }
}

/// Error payload returned by the API alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Entry point bundling every feature API over one shared executor.
///
/// # Example
/// ```no_run
/// use openai_kit::{ChatApi, ClientOptions, OpenAiClient};
/// use openai_kit::model::Model;
///
/// # async fn run() -> Result<(), openai_kit::ClientError> {
/// let client = OpenAiClient::new(ClientOptions::new("sk-..."))?;
/// let reply = client.chat().send_message("Hello!", Model::Gpt35Turbo).await?;
/// println!("{reply}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    executor: Arc<RequestExecutor>,
}

impl OpenAiClient {
    /// Build a client from options.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        Ok(Self {
            executor: Arc::new(RequestExecutor::new(options)?),
        })
    }

    /// Wrap an existing executor.
    pub fn from_executor(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// The executor every feature delegates to.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// The options the client was built with.
    pub fn options(&self) -> &ClientOptions {
        self.executor.options()
    }

    /// Chat completions.
    pub fn chat(&self) -> ChatEndpoint {
        ChatEndpoint::new(self.executor.clone())
    }

    /// Embeddings.
    pub fn embeddings(&self) -> EmbeddingsEndpoint {
        EmbeddingsEndpoint::new(self.executor.clone())
    }

    /// Assistants.
    pub fn assistants(&self) -> AssistantsEndpoint {
        AssistantsEndpoint::new(self.executor.clone())
    }

    /// Real-time sessions.
    pub fn realtime(&self) -> RealTimeEndpoint {
        RealTimeEndpoint::new(self.executor.clone())
    }
}
