//! Endpoint descriptors.
//!
//! Every API operation is described by an [`Endpoint`] value: the HTTP method, the path
//! relative to the configured base URL, and any query parameters. Paths never start with a
//! slash; the base URL carries the API version (`https://api.openai.com/v1`).

use std::borrow::Cow;

use itertools::Itertools;
use reqwest::Method;

use crate::model::ListQuery;

/// An API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST chat/completions`
    ChatCompletions,
    /// `POST embeddings`
    Embeddings,
    /// `POST assistants`
    CreateAssistant,
    /// `GET assistants`
    ListAssistants(Option<ListQuery>),
    /// `GET assistants/{id}`
    RetrieveAssistant(String),
    /// `POST assistants/{id}`
    ModifyAssistant(String),
    /// `DELETE assistants/{id}`
    DeleteAssistant(String),
    /// `POST realtime/sessions`
    RealTimeSessions,
}

impl Endpoint {
    /// The HTTP method to use for this endpoint.
    pub fn method(&self) -> Method {
        match self {
            Endpoint::ChatCompletions
            | Endpoint::Embeddings
            | Endpoint::CreateAssistant
            | Endpoint::ModifyAssistant(_)
            | Endpoint::RealTimeSessions => Method::POST,
            Endpoint::ListAssistants(_) | Endpoint::RetrieveAssistant(_) => Method::GET,
            Endpoint::DeleteAssistant(_) => Method::DELETE,
        }
    }

    /// Path segments, unencoded. Path parameters are single segments.
    pub fn segments(&self) -> Vec<Cow<'_, str>> {
        match self {
            Endpoint::ChatCompletions => vec!["chat".into(), "completions".into()],
            Endpoint::Embeddings => vec!["embeddings".into()],
            Endpoint::CreateAssistant | Endpoint::ListAssistants(_) => vec!["assistants".into()],
            Endpoint::RetrieveAssistant(id)
            | Endpoint::ModifyAssistant(id)
            | Endpoint::DeleteAssistant(id) => vec!["assistants".into(), id.as_str().into()],
            Endpoint::RealTimeSessions => vec!["realtime".into(), "sessions".into()],
        }
    }

    /// The path relative to the base URL.
    ///
    /// ```
    /// use openai_kit::endpoint::Endpoint;
    ///
    /// assert_eq!(Endpoint::ChatCompletions.path(), "chat/completions");
    /// assert_eq!(Endpoint::RetrieveAssistant("asst_1".into()).path(), "assistants/asst_1");
    /// ```
    pub fn path(&self) -> String {
        self.segments().iter().join("/")
    }

    /// Query parameters to append to the URL.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::ListAssistants(Some(query)) => query.pairs(),
            _ => Vec::new(),
        }
    }

    /// Value of the `OpenAI-Beta` header required by the endpoint.
    pub fn beta_header(&self) -> Option<&'static str> {
        match self {
            Endpoint::CreateAssistant
            | Endpoint::ListAssistants(_)
            | Endpoint::RetrieveAssistant(_)
            | Endpoint::ModifyAssistant(_)
            | Endpoint::DeleteAssistant(_) => Some("assistants=v2"),
            Endpoint::RealTimeSessions => Some("realtime=v1"),
            Endpoint::ChatCompletions | Endpoint::Embeddings => None,
        }
    }
}
