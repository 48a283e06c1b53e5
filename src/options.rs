//! Client configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::observer::RequestObserver;

/// Default API root. Endpoint paths are joined onto it, so it carries the version segment.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of additional attempts after a failed request.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Whether the secret holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Everything the request executor needs to talk to the API.
///
/// Supplied once when the client is constructed.
///
/// # Example
/// ```rust
/// use openai_kit::options::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new("sk-...")
///     .with_organization("org-123".to_string())
///     .with_timeout(Duration::from_secs(30))
///     .with_max_retries(3);
///
/// assert_eq!(options.organization.as_deref(), Some("org-123"));
/// assert_eq!(options.max_retries, 3);
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// API key sent as a bearer token
    pub api_key: SecretString,

    /// Organization id sent in the `OpenAI-Organization` header
    pub organization: Option<String>,

    /// API root, including the version segment
    pub base_url: String,

    /// Total deadline of a non-streaming request; for streams, the longest wait for the
    /// connection or the next read
    pub timeout: Duration,

    /// Additional attempts after the first failed one
    pub max_retries: u32,

    /// Base of the exponential backoff; attempt `n` waits `backoff_base * 2^n`
    pub backoff_base: Duration,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,

    /// Receives request/response/error notifications
    pub observer: Option<Arc<dyn RequestObserver>>,
}

impl ClientOptions {
    /// Create options with an API key and defaults for everything else.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            organization: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
            proxy: None,
            extra_headers: None,
            observer: None,
        }
    }

    /// Set the organization id.
    pub fn with_organization(mut self, organization: String) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry bound.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff base.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Install an observer.
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Wait before retry number `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Defaults without an API key; calls fail with `InvalidCredentials` until one is set.
impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &self.api_key)
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("proxy", &self.proxy)
            .field("extra_headers", &self.extra_headers)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
