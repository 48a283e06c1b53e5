//! Assistants (beta).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::executor::RequestExecutor;
use crate::model::{DeletionStatus, FunctionDefinition, ListQuery, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantToolType {
    CodeInterpreter,
    Retrieval,
    FileSearch,
    Function,
}

/// A tool enabled on an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTool {
    #[serde(rename = "type")]
    pub tool_type: AssistantToolType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDefinition>,
}

impl AssistantTool {
    pub fn code_interpreter() -> Self {
        Self {
            tool_type: AssistantToolType::CodeInterpreter,
            function: None,
        }
    }

    pub fn function(definition: FunctionDefinition) -> Self {
        Self {
            tool_type: AssistantToolType::Function,
            function: Some(definition),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<AssistantTool>,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// Request body for creating an assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateAssistantRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AssistantTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateAssistantRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Request body for modifying an assistant. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyAssistantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AssistantTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create(&self, request: &CreateAssistantRequest) -> Result<Assistant, ClientError>;

    async fn retrieve(&self, id: &str) -> Result<Assistant, ClientError>;

    async fn modify(
        &self,
        id: &str,
        request: &ModifyAssistantRequest,
    ) -> Result<Assistant, ClientError>;

    async fn delete(&self, id: &str) -> Result<DeletionStatus, ClientError>;

    async fn list(&self, query: Option<ListQuery>) -> Result<Page<Assistant>, ClientError>;
}

/// [`AssistantsApi`] over HTTP. Requests carry `OpenAI-Beta: assistants=v2`.
#[derive(Debug, Clone)]
pub struct AssistantsEndpoint {
    executor: Arc<RequestExecutor>,
}

impl AssistantsEndpoint {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl AssistantsApi for AssistantsEndpoint {
    async fn create(&self, request: &CreateAssistantRequest) -> Result<Assistant, ClientError> {
        self.executor
            .request(&Endpoint::CreateAssistant, Some(request))
            .await
    }

    async fn retrieve(&self, id: &str) -> Result<Assistant, ClientError> {
        self.executor
            .request::<_, ()>(&Endpoint::RetrieveAssistant(id.to_string()), None)
            .await
    }

    async fn modify(
        &self,
        id: &str,
        request: &ModifyAssistantRequest,
    ) -> Result<Assistant, ClientError> {
        self.executor
            .request(&Endpoint::ModifyAssistant(id.to_string()), Some(request))
            .await
    }

    async fn delete(&self, id: &str) -> Result<DeletionStatus, ClientError> {
        self.executor
            .request::<_, ()>(&Endpoint::DeleteAssistant(id.to_string()), None)
            .await
    }

    async fn list(&self, query: Option<ListQuery>) -> Result<Page<Assistant>, ClientError> {
        self.executor
            .request::<_, ()>(&Endpoint::ListAssistants(query), None)
            .await
    }
}
