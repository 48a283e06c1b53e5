mod common;

use futures::{SinkExt, StreamExt};
use httpmock::prelude::*;
use nonempty::nonempty;
use openai_kit::features::assistants::{
    AssistantTool, AssistantToolType, CreateAssistantRequest, ModifyAssistantRequest,
};
use openai_kit::features::embeddings::EmbeddingRequest;
use openai_kit::features::realtime::{
    CreateSessionRequest, MessageRole, RealTimeMessage, RealTimeSession, RealTimeSessionDelegate,
    SessionStatus,
};
use openai_kit::model::ListQuery;
use openai_kit::{AssistantsApi, ClientError, EmbeddingsApi, Model, OpenAiClient, RealTimeApi};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use common::{client, options, API_KEY};

fn assistant_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "object": "assistant",
        "created_at": 1700000000,
        "name": name,
        "description": null,
        "model": "gpt-4o",
        "instructions": "You are a personal math tutor.",
        "tools": [{"type": "code_interpreter"}],
        "file_ids": [],
        "metadata": {}
    })
}

#[tokio::test]
async fn test_embed_returns_first_vector() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .json_body(json!({"model": "text-embedding-ada-002", "input": ["The food was delicious"]}));
            then.status(200).json_body(json!({
                "object": "list",
                "model": "text-embedding-ada-002",
                "data": [{"object": "embedding", "embedding": [0.0023, -0.0093, 0.0154], "index": 0}],
                "usage": {"prompt_tokens": 5, "total_tokens": 5}
            }));
        })
        .await;

    let vector = client(&server)
        .embeddings()
        .embed("The food was delicious", Model::TextEmbeddingAda002)
        .await
        .unwrap();

    assert_eq!(vector, vec![0.0023, -0.0093, 0.0154]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_embed_with_empty_data_is_invalid() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(json!({"object": "list", "model": "m", "data": []}));
        })
        .await;

    let err = client(&server)
        .embeddings()
        .embed("text", Model::TextEmbedding3Small)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse));
}

#[tokio::test]
async fn test_create_embeddings_for_several_inputs() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .json_body(json!({"model": "text-embedding-3-large", "input": ["a", "b"], "user": "u-1"}));
            then.status(200).json_body(json!({
                "object": "list",
                "model": "text-embedding-3-large",
                "data": [
                    {"object": "embedding", "embedding": [1.0], "index": 0},
                    {"object": "embedding", "embedding": [2.0], "index": 1}
                ],
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            }));
        })
        .await;

    let request = EmbeddingRequest {
        user: Some("u-1".to_string()),
        ..EmbeddingRequest::new(Model::TextEmbedding3Large, nonempty!["a".to_string(), "b".to_string()])
    };
    let response = client(&server)
        .embeddings()
        .create_embeddings(&request)
        .await
        .unwrap();

    assert_eq!(response.data.len(), 2);
    assert_eq!(response.data[1].index, 1);
    assert_eq!(response.usage.prompt_tokens, 2);
}

#[tokio::test]
async fn test_assistant_create_sends_beta_header() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/assistants")
                .header("OpenAI-Beta", "assistants=v2")
                .json_body(json!({
                    "model": "gpt-4o",
                    "name": "Math Tutor",
                    "instructions": "You are a personal math tutor.",
                    "tools": [{"type": "code_interpreter"}]
                }));
            then.status(200).json_body(assistant_json("asst_abc123", "Math Tutor"));
        })
        .await;

    let request = CreateAssistantRequest {
        name: Some("Math Tutor".to_string()),
        instructions: Some("You are a personal math tutor.".to_string()),
        tools: Some(vec![AssistantTool::code_interpreter()]),
        ..CreateAssistantRequest::new("gpt-4o")
    };
    let assistant = client(&server).assistants().create(&request).await.unwrap();

    assert_eq!(assistant.id, "asst_abc123");
    assert_eq!(assistant.tools[0].tool_type, AssistantToolType::CodeInterpreter);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_assistant_retrieve_modify_delete() {
    let server = MockServer::start_async().await;

    let retrieve = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/assistants/asst_abc123")
                .header("OpenAI-Beta", "assistants=v2");
            then.status(200).json_body(assistant_json("asst_abc123", "Math Tutor"));
        })
        .await;
    let modify = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/assistants/asst_abc123")
                .json_body(json!({"name": "Tutor"}));
            then.status(200).json_body(assistant_json("asst_abc123", "Tutor"));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/v1/assistants/asst_abc123");
            then.status(200).json_body(json!({
                "id": "asst_abc123",
                "object": "assistant.deleted",
                "deleted": true
            }));
        })
        .await;

    let assistants = client(&server).assistants();

    let fetched = assistants.retrieve("asst_abc123").await.unwrap();
    assert_eq!(fetched.name.as_deref(), Some("Math Tutor"));

    let changes = ModifyAssistantRequest {
        name: Some("Tutor".to_string()),
        ..Default::default()
    };
    let modified = assistants.modify("asst_abc123", &changes).await.unwrap();
    assert_eq!(modified.name.as_deref(), Some("Tutor"));

    let status = assistants.delete("asst_abc123").await.unwrap();
    assert!(status.deleted);

    retrieve.assert_async().await;
    modify.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn test_assistant_list_passes_query() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/assistants")
                .query_param("limit", "2")
                .query_param("order", "desc");
            then.status(200).json_body(json!({
                "object": "list",
                "data": [assistant_json("asst_1", "One"), assistant_json("asst_2", "Two")],
                "first_id": "asst_1",
                "last_id": "asst_2",
                "has_more": true
            }));
        })
        .await;

    let query = ListQuery {
        limit: Some(2),
        order: Some("desc".to_string()),
        ..Default::default()
    };
    let page = client(&server).assistants().list(Some(query)).await.unwrap();

    assert_eq!(page.data.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.last_id.as_deref(), Some("asst_2"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_assistant_not_found_surfaces_api_error() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/assistants/missing");
            then.status(404).json_body(json!({
                "error": {"message": "No assistant found", "type": "invalid_request_error", "code": null}
            }));
        })
        .await;

    let err = client(&server).assistants().retrieve("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.api_error().unwrap().message, "No assistant found");
}

#[tokio::test]
async fn test_realtime_create_session() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/realtime/sessions")
                .header("OpenAI-Beta", "realtime=v1")
                .json_body(json!({"model": "gpt-4o"}));
            then.status(200).json_body(json!({
                "session": {"id": "sess_1", "status": "active", "created_at": 1, "expires_at": 61},
                "url": "wss://realtime.example.com/sess_1"
            }));
        })
        .await;

    let response = client(&server)
        .realtime()
        .create(&CreateSessionRequest { model: Model::Gpt4o })
        .await
        .unwrap();

    assert_eq!(response.session.id, "sess_1");
    assert_eq!(response.session.status, SessionStatus::Active);
    assert_eq!(response.url, "wss://realtime.example.com/sess_1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_realtime_connect_rejects_bad_url() {
    let server = MockServer::start_async().await;
    let session = RealTimeSession {
        id: "sess_1".to_string(),
        status: SessionStatus::Active,
        created_at: 0,
        expires_at: 0,
    };

    let err = client(&server)
        .realtime()
        .connect(session, "not a url")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl(_)));
}

#[derive(Default)]
struct SessionRecorder {
    statuses: Vec<SessionStatus>,
    messages: Vec<String>,
    errors: Vec<String>,
}

impl RealTimeSessionDelegate for SessionRecorder {
    fn on_message(&mut self, _session: &RealTimeSession, message: RealTimeMessage) {
        self.messages.push(message.content);
    }

    fn on_error(&mut self, _session: &RealTimeSession, error: ClientError) {
        self.errors.push(error.to_string());
    }

    fn on_status_change(&mut self, _session: &RealTimeSession, status: SessionStatus) {
        self.statuses.push(status);
    }
}

fn require_handshake_headers(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    let auth = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    let header = |name: &str| request.headers().get(name).and_then(|v| v.to_str().ok());
    if auth == Some("Bearer test-key")
        && header("openai-beta") == Some("realtime=v1")
        && header("openai-organization") == Some("org-7")
        && header("x-trace-id") == Some("trace-1")
    {
        Ok(response)
    } else {
        let mut rejection = ErrorResponse::new(Some("unauthorized".to_string()));
        *rejection.status_mut() = StatusCode::UNAUTHORIZED;
        Err(rejection)
    }
}

#[tokio::test]
async fn test_realtime_connection_round_trip() {
    assert_eq!(API_KEY, "test-key");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ws_server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_hdr_async(tcp, require_handshake_headers)
            .await
            .unwrap();

        let incoming = ws.next().await.unwrap().unwrap();
        let sent: serde_json::Value = serde_json::from_str(incoming.to_text().unwrap()).unwrap();
        let reply = format!("echo: {}", sent["content"].as_str().unwrap());

        let frames = [
            json!({"type": "ping"}),
            json!({"type": "message", "message": {"role": "assistant", "content": reply}}),
            json!({"type": "message"}),
            json!({"type": "error", "error": {"code": "rate_limit", "message": "slow down"}}),
            json!({"type": "error"}),
        ];
        for frame in frames {
            ws.send(Message::text(frame.to_string())).await.unwrap();
        }
        let _ = ws.close(None).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let http = MockServer::start_async().await;
    let session = RealTimeSession {
        id: "sess_1".to_string(),
        status: SessionStatus::Active,
        created_at: 0,
        expires_at: 0,
    };
    let client = OpenAiClient::new(
        options(&http)
            .with_organization("org-7".to_string())
            .with_header("X-Trace-Id".to_string(), "trace-1".to_string()),
    )
    .unwrap();
    let mut connection = client
        .realtime()
        .connect(session, &format!("ws://{addr}/"))
        .await
        .unwrap();
    assert_eq!(connection.session().id, "sess_1");

    connection
        .send(&RealTimeMessage::new(MessageRole::User, "hi"))
        .await
        .unwrap();

    let mut recorder = SessionRecorder::default();
    connection.run(&mut recorder, &CancellationToken::new()).await;

    assert_eq!(recorder.statuses, vec![SessionStatus::Active, SessionStatus::Expired]);
    assert_eq!(recorder.messages, vec!["echo: hi"]);
    assert_eq!(
        recorder.errors,
        vec![
            "The response was invalid",
            "Server error: slow down",
            "Server error: unspecified server error",
        ]
    );

    ws_server.await.unwrap();
}
