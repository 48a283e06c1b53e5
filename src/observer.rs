//! Hooks for watching traffic without changing it.

use reqwest::Method;

use crate::client::ClientError;

/// Receives a notification for every outbound request, inbound response and error.
///
/// Observers are called inline by the executor and must not block.
pub trait RequestObserver: Send + Sync {
    /// Called right before a request is sent.
    fn on_request(&self, method: &Method, url: &str, body: Option<&[u8]>);

    /// Called when a response status line has been received.
    fn on_response(&self, url: &str, status: u16);

    /// Called for every failed attempt, including ones that will be retried.
    fn on_error(&self, url: &str, error: &ClientError);
}

/// Observer that writes everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, method: &Method, url: &str, body: Option<&[u8]>) {
        match body {
            Some(bytes) => tracing::info!(
                %method,
                url,
                body = %String::from_utf8_lossy(bytes),
                "OpenAI request"
            ),
            None => tracing::info!(%method, url, "OpenAI request"),
        }
    }

    fn on_response(&self, url: &str, status: u16) {
        tracing::info!(url, status, "OpenAI response");
    }

    fn on_error(&self, url: &str, error: &ClientError) {
        tracing::warn!(url, error = %error, "OpenAI request failed");
    }
}
