//! # openai-kit - OpenAI API Client Library
//!
//! An async client for the OpenAI REST API: chat completions (plain and streamed),
//! embeddings, assistants and real-time sessions.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - One shared request executor with bounded retries and exponential backoff
//! - Streaming via Server-Sent Events, as a `futures::Stream` or pushed into a consumer
//! - Accumulation of streamed chunks into a final message, including function calls
//! - One error type for every failure
//!
//! ## Architecture
//!
//! Every API feature is a trait (`ChatApi`, `EmbeddingsApi`, ...) with one HTTP
//! implementation holding a shared [`RequestExecutor`](executor::RequestExecutor).
//! [`OpenAiClient`] builds the executor from [`ClientOptions`] and hands the features out.
//!
//! ## Example
//! ```no_run
//! use openai_kit::{ChatApi, ClientOptions, Model, OpenAiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAiClient::new(ClientOptions::new("your-api-key"))?;
//!
//!     let reply = client.chat().send_message("Hello!", Model::Gpt4oMini).await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoint;
pub mod executor;
pub mod features;
pub mod http;
pub mod model;
pub mod observer;
pub mod options;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use client::{ApiError, ClientError, OpenAiClient};
pub use features::chat::{AccumulatingConsumer, ChatAccumulator, ChatCompletionRequest, ChatMessage};
pub use features::{AssistantsApi, ChatApi, EmbeddingsApi, RealTimeApi};
pub use model::Model;
pub use observer::{RequestObserver, TracingObserver};
pub use options::{ClientOptions, SecretString};
pub use stream::{StreamConsumer, StreamOutcome};
