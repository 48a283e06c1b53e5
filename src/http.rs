//! HTTP client construction and request building.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::options::ClientOptions;

/// Header carrying the organization id.
pub const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// Header opting into beta API surfaces.
pub const BETA_HEADER: &str = "OpenAI-Beta";

/// Header carrying the epoch second at which the rate limit resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Build a configured HTTP client from options.
///
/// The timeout bounds connecting and each read, not the whole exchange, so a stream that
/// keeps delivering chunks is never cut off. Non-streaming calls add a total deadline per
/// request.
pub fn build_http_client(options: &ClientOptions) -> Result<Client, ClientError> {
    let mut builder = Client::builder()
        .connect_timeout(options.timeout)
        .read_timeout(options.timeout);

    if let Some(proxy_url) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("invalid proxy {proxy_url}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))
}

/// Authentication, content-type and organization headers sent with every request.
pub fn default_headers(options: &ClientOptions) -> Result<HeaderMap, ClientError> {
    if options.api_key.is_blank() {
        return Err(ClientError::InvalidCredentials);
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", options.api_key.expose_secret()))
        .map_err(|_| ClientError::InvalidCredentials)?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    if let Some(organization) = &options.organization {
        let value = HeaderValue::from_str(organization)
            .map_err(|_| ClientError::Config(format!("invalid organization id: {organization}")))?;
        headers.insert(HeaderName::from_static("openai-organization"), value);
    }

    Ok(headers)
}

/// Join the base URL with the endpoint's path segments and query.
///
/// Path parameters are percent-encoded, so an id can never escape its segment.
pub fn endpoint_url(base_url: &str, endpoint: &Endpoint) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{base_url} cannot be a base URL")))?;
        segments.pop_if_empty();
        for segment in endpoint.segments() {
            segments.push(&segment);
        }
    }

    let query = endpoint.query();
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
}

/// Add extra headers to a request if specified in options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Add the `OpenAI-Beta` header if the endpoint needs one.
pub fn add_beta_header(request: RequestBuilder, endpoint: &Endpoint) -> RequestBuilder {
    match endpoint.beta_header() {
        Some(value) => request.header(BETA_HEADER, value),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_http_client() {
        let options = ClientOptions::new("test").with_timeout(Duration::from_secs(30));
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let options = ClientOptions::new("test").with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_default_headers() {
        let options = ClientOptions::new("sk-test").with_organization("org-1".to_string());
        let headers = default_headers(&options).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ORGANIZATION_HEADER], "org-1");
    }

    #[test]
    fn test_default_headers_without_organization() {
        let headers = default_headers(&ClientOptions::new("sk-test")).unwrap();
        assert!(headers.get(ORGANIZATION_HEADER).is_none());
    }

    #[test]
    fn test_blank_key_is_invalid_credentials() {
        let err = default_headers(&ClientOptions::new("")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
    }

    #[test]
    fn test_endpoint_url() {
        let url = endpoint_url("https://api.openai.com/v1", &Endpoint::ChatCompletions).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let trailing = endpoint_url("https://api.openai.com/v1/", &Endpoint::Embeddings).unwrap();
        assert_eq!(trailing.as_str(), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn test_endpoint_url_encodes_ids() {
        let url = endpoint_url(
            "https://api.openai.com/v1",
            &Endpoint::RetrieveAssistant("a/b c".to_string()),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/assistants/a%2Fb%20c");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        let err = endpoint_url("not a url", &Endpoint::ChatCompletions).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }
}
