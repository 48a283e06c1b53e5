//! Feature APIs built on the shared [`RequestExecutor`](crate::executor::RequestExecutor).
//!
//! Each feature exposes one trait and one endpoint struct holding the executor; the
//! [`OpenAiClient`](crate::client::OpenAiClient) hands them out.

pub mod assistants;
pub mod chat;
pub mod embeddings;
pub mod realtime;

pub use assistants::{AssistantsApi, AssistantsEndpoint};
pub use chat::{ChatApi, ChatEndpoint};
pub use embeddings::{EmbeddingsApi, EmbeddingsEndpoint};
pub use realtime::{RealTimeApi, RealTimeEndpoint};
