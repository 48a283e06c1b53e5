//! Data models shared across feature APIs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary capability of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPurpose {
    ChatCompletion,
    Embedding,
    ImageGeneration,
    AudioTranscription,
    TextToSpeech,
    Moderation,
}

/// Model identifier.
///
/// Serialized as the plain id string. Ids that are not listed here round-trip through
/// [`Model::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Model {
    Gpt4,
    Gpt4Turbo,
    Gpt4Vision,
    Gpt4_32k,
    Gpt4o,
    Gpt4oMini,
    Gpt35Turbo,
    Gpt35Turbo16k,
    TextEmbeddingAda002,
    TextEmbedding3Small,
    TextEmbedding3Large,
    Dalle2,
    Dalle3,
    Whisper1,
    Tts1,
    Tts1Hd,
    ModerationLatest,
    ModerationStable,
    Custom(String),
}

const KNOWN_MODELS: &[Model] = &[
    Model::Gpt4,
    Model::Gpt4Turbo,
    Model::Gpt4Vision,
    Model::Gpt4_32k,
    Model::Gpt4o,
    Model::Gpt4oMini,
    Model::Gpt35Turbo,
    Model::Gpt35Turbo16k,
    Model::TextEmbeddingAda002,
    Model::TextEmbedding3Small,
    Model::TextEmbedding3Large,
    Model::Dalle2,
    Model::Dalle3,
    Model::Whisper1,
    Model::Tts1,
    Model::Tts1Hd,
    Model::ModerationLatest,
    Model::ModerationStable,
];

impl Model {
    /// The id sent over the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt4 => "gpt-4",
            Model::Gpt4Turbo => "gpt-4-1106-preview",
            Model::Gpt4Vision => "gpt-4-vision-preview",
            Model::Gpt4_32k => "gpt-4-32k",
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gpt35Turbo => "gpt-3.5-turbo",
            Model::Gpt35Turbo16k => "gpt-3.5-turbo-16k",
            Model::TextEmbeddingAda002 => "text-embedding-ada-002",
            Model::TextEmbedding3Small => "text-embedding-3-small",
            Model::TextEmbedding3Large => "text-embedding-3-large",
            Model::Dalle2 => "dall-e-2",
            Model::Dalle3 => "dall-e-3",
            Model::Whisper1 => "whisper-1",
            Model::Tts1 => "tts-1",
            Model::Tts1Hd => "tts-1-hd",
            Model::ModerationLatest => "text-moderation-latest",
            Model::ModerationStable => "text-moderation-stable",
            Model::Custom(id) => id,
        }
    }

    /// Context window in tokens.
    pub fn max_tokens(&self) -> u32 {
        match self {
            Model::Gpt4 => 8192,
            Model::Gpt4Turbo | Model::Gpt4Vision | Model::Gpt4o | Model::Gpt4oMini => 128_000,
            Model::Gpt4_32k => 32768,
            Model::Gpt35Turbo => 4096,
            Model::Gpt35Turbo16k => 16384,
            Model::TextEmbeddingAda002 | Model::TextEmbedding3Small | Model::TextEmbedding3Large => {
                8191
            }
            _ => 4096,
        }
    }

    /// Whether the model accepts image input.
    pub fn supports_vision(&self) -> bool {
        matches!(
            self,
            Model::Gpt4Vision | Model::Gpt4o | Model::Gpt4oMini | Model::Dalle2 | Model::Dalle3
        )
    }

    /// Whether the model consumes or produces audio.
    pub fn supports_audio(&self) -> bool {
        matches!(self, Model::Whisper1 | Model::Tts1 | Model::Tts1Hd)
    }

    /// Primary capability. Custom ids are assumed to be chat models.
    pub fn purpose(&self) -> ModelPurpose {
        match self {
            Model::TextEmbeddingAda002 | Model::TextEmbedding3Small | Model::TextEmbedding3Large => {
                ModelPurpose::Embedding
            }
            Model::Dalle2 | Model::Dalle3 => ModelPurpose::ImageGeneration,
            Model::Whisper1 => ModelPurpose::AudioTranscription,
            Model::Tts1 | Model::Tts1Hd => ModelPurpose::TextToSpeech,
            Model::ModerationLatest | Model::ModerationStable => ModelPurpose::Moderation,
            _ => ModelPurpose::ChatCompletion,
        }
    }

    /// Recommended model for a purpose.
    pub fn default_for(purpose: ModelPurpose) -> Model {
        match purpose {
            ModelPurpose::ChatCompletion => Model::Gpt35Turbo,
            ModelPurpose::Embedding => Model::TextEmbeddingAda002,
            ModelPurpose::ImageGeneration => Model::Dalle3,
            ModelPurpose::AudioTranscription => Model::Whisper1,
            ModelPurpose::TextToSpeech => Model::Tts1,
            ModelPurpose::Moderation => Model::ModerationLatest,
        }
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        match model {
            Model::Custom(id) => id,
            known => known.as_str().to_string(),
        }
    }
}

impl From<String> for Model {
    fn from(id: String) -> Self {
        KNOWN_MODELS
            .iter()
            .find(|m| m.as_str() == id)
            .cloned()
            .unwrap_or(Model::Custom(id))
    }
}

impl From<&str> for Model {
    fn from(id: &str) -> Self {
        Model::from(id.to_string())
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON Schema document describing function parameters.
///
/// Wraps the recursive [`serde_json::Value`] tree, so any schema the API accepts can be
/// expressed, while the builder methods cover the common object-with-properties shape.
///
/// ```
/// use openai_kit::model::JsonSchema;
///
/// let schema = JsonSchema::object()
///     .property("city", JsonSchema::string().describe("City name"))
///     .property("days", JsonSchema::integer())
///     .require("city");
///
/// assert_eq!(schema.as_value()["properties"]["city"]["type"], "string");
/// assert_eq!(schema.as_value()["required"][0], "city");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema(Value);

impl JsonSchema {
    fn typed(kind: &str) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(kind.to_string()));
        Self(Value::Object(map))
    }

    /// `{"type": "object", "properties": {}}`
    pub fn object() -> Self {
        let mut schema = Self::typed("object");
        schema.insert("properties", Value::Object(Map::new()));
        schema
    }

    /// `{"type": "string"}`
    pub fn string() -> Self {
        Self::typed("string")
    }

    /// `{"type": "integer"}`
    pub fn integer() -> Self {
        Self::typed("integer")
    }

    /// `{"type": "number"}`
    pub fn number() -> Self {
        Self::typed("number")
    }

    /// `{"type": "boolean"}`
    pub fn boolean() -> Self {
        Self::typed("boolean")
    }

    /// `{"type": "array", "items": <items>}`
    pub fn array(items: JsonSchema) -> Self {
        let mut schema = Self::typed("array");
        schema.insert("items", items.0);
        schema
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.insert("description", Value::String(description.to_string()));
        self
    }

    /// Restrict a string schema to a set of values.
    pub fn enumerate<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| Value::String(v.into())).collect();
        self.insert("enum", Value::Array(values));
        self
    }

    /// Add a property to an object schema.
    pub fn property(mut self, name: &str, schema: JsonSchema) -> Self {
        if let Value::Object(map) = &mut self.0 {
            let properties = map
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(properties) = properties {
                properties.insert(name.to_string(), schema.0);
            }
        }
        self
    }

    /// Mark a property as required.
    pub fn require(mut self, name: &str) -> Self {
        if let Value::Object(map) = &mut self.0 {
            let required = map
                .entry("required")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(required) = required {
                required.push(Value::String(name.to_string()));
            }
        }
        self
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn insert(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
    }
}

impl From<Value> for JsonSchema {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<JsonSchema> for Value {
    fn from(schema: JsonSchema) -> Self {
        schema.0
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: JsonSchema,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, parameters: JsonSchema) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Result of deleting a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    pub object: String,
    pub deleted: bool,
}

/// Pagination parameters for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Maximum number of results to return
    pub limit: Option<u32>,
    /// Cursor for the next page
    pub after: Option<String>,
    /// Cursor for the previous page
    pub before: Option<String>,
    /// `asc` or `desc` by creation time
    pub order: Option<String>,
}

impl ListQuery {
    /// Non-empty parameters as URL query pairs.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        pairs
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
}
