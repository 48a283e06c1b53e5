//! Request execution: URL and header assembly, status classification, retries, streaming.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::http::{
    add_beta_header, add_extra_headers, build_http_client, default_headers, endpoint_url,
    RATE_LIMIT_RESET_HEADER,
};
use crate::options::ClientOptions;
use crate::sse::SSEResponseExt;
use crate::stream::{decode_events, drive, StreamConsumer, StreamOutcome};

/// Sends requests described by [`Endpoint`]s and decodes their responses.
///
/// One executor holds one pooled HTTP client and is meant to be shared behind an `Arc`.
/// Calls keep no shared mutable state: the retry counter of a call lives on that call's
/// stack.
pub struct RequestExecutor {
    options: ClientOptions,
    http: Client,
    /// `None` when the API key is unusable; every call then fails with `InvalidCredentials`.
    headers: Option<HeaderMap>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Build an executor. Fails on a malformed base URL, proxy or header value.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        endpoint_url(&options.base_url, &Endpoint::ChatCompletions)?;
        let http = build_http_client(&options)?;
        let headers = match default_headers(&options) {
            Ok(headers) => Some(headers),
            // Reported on the first call so a client can still be constructed and inspected.
            Err(ClientError::InvalidCredentials) => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            options,
            http,
            headers,
        })
    }

    /// The options the executor was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Send a request and decode the JSON response, retrying transient failures.
    pub async fn request<T, B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_with_cancel(endpoint, body, &CancellationToken::new())
            .await
    }

    /// Like [`request`](Self::request), with a token that aborts the call.
    ///
    /// Cancelling during an attempt or during the backoff wait surfaces
    /// [`ClientError::Cancelled`]; no further attempt is made.
    pub async fn request_with_cancel<T, B>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = endpoint_url(&self.options.base_url, endpoint)?;
        let payload = encode_body(body)?;
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                result = self.attempt(endpoint, &url, payload.as_deref()) => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            self.notify_error(&url, &err);

            if attempt >= self.options.max_retries || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.options.backoff_delay(attempt);
            warn!(
                attempt = attempt + 1,
                max_retries = self.options.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        url: &Url,
        payload: Option<&[u8]>,
    ) -> Result<T, ClientError> {
        let response = self.send(endpoint, url, payload, false).await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ClientError::Decoding)
    }

    /// Open a streaming request and decode its `data:` lines as they arrive.
    ///
    /// The initial status is checked before the stream is returned; after that, errors come
    /// through the stream as its last item. No retries happen here.
    pub async fn stream<T, B>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<BoxStream<'static, Result<T, ClientError>>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let url = endpoint_url(&self.options.base_url, endpoint)?;
        let payload = encode_body(Some(body))?;

        let opened = async {
            let response = self.send(endpoint, &url, payload.as_deref(), true).await?;
            check_status(response).await
        }
        .await;

        match opened {
            Ok(response) => Ok(decode_events(response.lines()).boxed()),
            Err(err) => {
                self.notify_error(&url, &err);
                Err(err)
            }
        }
    }

    /// Drive a consumer through a streaming request.
    pub async fn stream_request<T, B, C>(
        &self,
        endpoint: &Endpoint,
        body: &B,
        consumer: &mut C,
    ) -> StreamOutcome
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
        C: StreamConsumer<T> + ?Sized,
    {
        self.stream_request_with_cancel(endpoint, body, consumer, &CancellationToken::new())
            .await
    }

    /// Like [`stream_request`](Self::stream_request), with a token that closes the connection.
    ///
    /// Once the token fires no further lines are read and the consumer is not called again.
    pub async fn stream_request_with_cancel<T, B, C>(
        &self,
        endpoint: &Endpoint,
        body: &B,
        consumer: &mut C,
        cancel: &CancellationToken,
    ) -> StreamOutcome
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
        C: StreamConsumer<T> + ?Sized,
    {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            opened = self.stream::<T, B>(endpoint, body) => opened,
        };

        match opened {
            Ok(events) => drive(events, consumer, cancel).await,
            Err(err) => {
                consumer.on_error(err);
                StreamOutcome::Failed
            }
        }
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        url: &Url,
        payload: Option<&[u8]>,
        event_stream: bool,
    ) -> Result<Response, ClientError> {
        let headers = self
            .headers
            .as_ref()
            .ok_or(ClientError::InvalidCredentials)?;

        let method = endpoint.method();
        debug!(%method, url = %url, "Sending request");
        if let Some(observer) = &self.options.observer {
            observer.on_request(&method, url.as_str(), payload);
        }

        let mut req = self
            .http
            .request(method, url.clone())
            .headers(headers.clone());
        req = add_beta_header(req, endpoint);
        req = add_extra_headers(req, &self.options.extra_headers);
        if event_stream {
            req = req.header(ACCEPT, HeaderValue::from_static("text/event-stream"));
        } else {
            req = req.timeout(self.options.timeout);
        }
        if let Some(payload) = payload {
            req = req.body(payload.to_vec());
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        debug!(url = %url, status, "Received response");
        if let Some(observer) = &self.options.observer {
            observer.on_response(url.as_str(), status);
        }
        Ok(response)
    }

    fn notify_error(&self, url: &Url, err: &ClientError) {
        debug!(url = %url, error = %err, "Request attempt failed");
        if let Some(observer) = &self.options.observer {
            observer.on_error(url.as_str(), err);
        }
    }
}

fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Vec<u8>>, ClientError> {
    body.map(serde_json::to_vec)
        .transpose()
        .map_err(ClientError::Encoding)
}

/// Map a non-2xx response to its error; pass 2xx responses through.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = parse_reset_time(response.headers());
        return Err(ClientError::RateLimited { reset_at });
    }

    let body = response.text().await.map_err(|e| {
        debug!(status = status.as_u16(), error = %e, "Failed to read error body");
        ClientError::from(e)
    })?;
    Err(ClientError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Read the rate-limit reset header as epoch seconds.
pub(crate) fn parse_reset_time(headers: &HeaderMap) -> Option<SystemTime> {
    let raw = headers.get(RATE_LIMIT_RESET_HEADER)?.to_str().ok()?;
    let seconds: f64 = raw.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    UNIX_EPOCH.checked_add(Duration::try_from_secs_f64(seconds).ok()?)
}
