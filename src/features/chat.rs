//! Chat Completions.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::executor::RequestExecutor;
use crate::model::{FunctionDefinition, Model, ModelPurpose};
use crate::stream::{StreamConsumer, StreamOutcome};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Function,
    Tool,
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model. Not validated.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// The result of a function call, sent back to the model.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(ChatRole::Function, content)
        }
    }
}

/// Controls whether and which function the model calls.
///
/// Serialized as `"auto"`, `"none"` or `{"name": "<function>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCallOption {
    Auto,
    None,
    Function(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FunctionCallOptionRepr {
    Mode(String),
    Named { name: String },
}

impl Serialize for FunctionCallOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            FunctionCallOption::Auto => FunctionCallOptionRepr::Mode("auto".to_string()),
            FunctionCallOption::None => FunctionCallOptionRepr::Mode("none".to_string()),
            FunctionCallOption::Function(name) => FunctionCallOptionRepr::Named { name: name.clone() },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FunctionCallOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match FunctionCallOptionRepr::deserialize(deserializer)? {
            FunctionCallOptionRepr::Mode(mode) if mode == "none" => Ok(FunctionCallOption::None),
            FunctionCallOptionRepr::Mode(mode) if mode == "auto" => Ok(FunctionCallOption::Auto),
            FunctionCallOptionRepr::Mode(other) => Err(serde::de::Error::unknown_variant(
                &other,
                &["auto", "none"],
            )),
            FunctionCallOptionRepr::Named { name } => Ok(FunctionCallOption::Function(name)),
        }
    }
}

/// Request body for `POST chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: Model,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatCompletionRequest {
    pub fn new(model: Model, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            temperature: None,
            top_p: None,
            n: None,
            stream: None,
            stop: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
            functions: None,
            function_call: None,
            user: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_function_call(mut self, function_call: FunctionCallOption) -> Self {
        self.function_call = Some(function_call);
        self
    }

    fn streaming(&self) -> Self {
        Self {
            stream: Some(true),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One `data:` payload of a streaming completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delta {
    pub role: Option<ChatRole>,
    pub content: Option<String>,
    pub function_call: Option<FunctionCallDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionCallDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Folds streamed chunks into a single assistant message.
///
/// Only the first choice of each chunk is read.
///
/// ```
/// use openai_kit::features::chat::{ChatAccumulator, ChatCompletionChunk};
///
/// let mut acc = ChatAccumulator::default();
/// for text in ["Hel", "lo"] {
///     let chunk: ChatCompletionChunk = serde_json::from_value(serde_json::json!({
///         "choices": [{"delta": {"content": text}}]
///     }))
///     .unwrap();
///     acc.push(&chunk);
/// }
/// assert_eq!(acc.finish().content.as_deref(), Some("Hello"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatAccumulator {
    content: String,
    function_name: Option<String>,
    function_arguments: String,
}

impl ChatAccumulator {
    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        let Some(choice) = chunk.choices.first() else {
            return;
        };

        if let Some(content) = &choice.delta.content {
            self.content.push_str(content);
        }

        if let Some(call) = &choice.delta.function_call {
            if self.function_name.is_none() {
                self.function_name = call.name.clone();
            }
            if let Some(arguments) = &call.arguments {
                self.function_arguments.push_str(arguments);
            }
        }
    }

    /// The final message. A function call, when one was streamed, replaces the text.
    pub fn finish(self) -> ChatMessage {
        match self.function_name {
            Some(name) => ChatMessage {
                role: ChatRole::Assistant,
                content: None,
                name: None,
                function_call: Some(FunctionCall {
                    name,
                    arguments: self.function_arguments,
                }),
            },
            None => ChatMessage::assistant(self.content),
        }
    }
}

/// A [`StreamConsumer`] that accumulates chunks and reports the final message once.
pub struct AccumulatingConsumer<F>
where
    F: FnOnce(Result<ChatMessage, ClientError>) + Send,
{
    accumulator: ChatAccumulator,
    completion: Option<F>,
}

impl<F> AccumulatingConsumer<F>
where
    F: FnOnce(Result<ChatMessage, ClientError>) + Send,
{
    pub fn new(completion: F) -> Self {
        Self {
            accumulator: ChatAccumulator::default(),
            completion: Some(completion),
        }
    }
}

impl<F> StreamConsumer<ChatCompletionChunk> for AccumulatingConsumer<F>
where
    F: FnOnce(Result<ChatMessage, ClientError>) + Send,
{
    fn on_chunk(&mut self, chunk: ChatCompletionChunk) {
        self.accumulator.push(&chunk);
    }

    fn on_complete(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion(Ok(std::mem::take(&mut self.accumulator).finish()));
        }
    }

    fn on_error(&mut self, error: ClientError) {
        if let Some(completion) = self.completion.take() {
            completion(Err(error));
        }
    }
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Create a completion and wait for the whole response.
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError>;

    /// Stream a completion into a consumer. `stream` is forced on.
    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
        consumer: &mut dyn StreamConsumer<ChatCompletionChunk>,
    ) -> StreamOutcome;

    /// Stream a completion as chunks. `stream` is forced on.
    async fn stream_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<ChatCompletionChunk, ClientError>>, ClientError>;

    /// Stream a completion and return the accumulated assistant message.
    async fn stream_message(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatMessage, ClientError>;

    /// Send one user message and return the reply text.
    async fn send_message(&self, text: &str, model: Model) -> Result<String, ClientError>;
}

/// [`ChatApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    executor: Arc<RequestExecutor>,
}

impl ChatEndpoint {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Model used when a caller has no preference.
    pub fn default_model() -> Model {
        Model::default_for(ModelPurpose::ChatCompletion)
    }
}

#[async_trait]
impl ChatApi for ChatEndpoint {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        self.executor
            .request(&Endpoint::ChatCompletions, Some(request))
            .await
    }

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
        consumer: &mut dyn StreamConsumer<ChatCompletionChunk>,
    ) -> StreamOutcome {
        self.executor
            .stream_request::<ChatCompletionChunk, _, _>(
                &Endpoint::ChatCompletions,
                &request.streaming(),
                consumer,
            )
            .await
    }

    async fn stream_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<ChatCompletionChunk, ClientError>>, ClientError> {
        self.executor
            .stream(&Endpoint::ChatCompletions, &request.streaming())
            .await
    }

    async fn stream_message(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatMessage, ClientError> {
        let mut chunks = self.stream_chat_completion(request).await?;
        let mut accumulator = ChatAccumulator::default();
        while let Some(chunk) = chunks.next().await {
            accumulator.push(&chunk?);
        }
        Ok(accumulator.finish())
    }

    async fn send_message(&self, text: &str, model: Model) -> Result<String, ClientError> {
        let request = ChatCompletionRequest::new(model, vec![ChatMessage::user(text)]);
        let response = self.create_chat_completion(&request).await?;
        let choice = response.choices.first().ok_or(ClientError::InvalidResponse)?;
        Ok(choice.message.content.clone().unwrap_or_default())
    }
}
