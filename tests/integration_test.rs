use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use genai_client::chat::SharedChat;
use genai_client::transport::http::Credentials;
use genai_client::types::{
    Content, CreateInteractionParams, FinishReason, GenerateContentConfig, InteractionEvent,
    InteractionStatus, KnownOrRaw, RoutingConfig,
};
use genai_client::{
    BackendProfile, Client, GenAiError, GenerateContentParameters, ReplaySession, ReplayTransport,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const MODEL: &str = "gemini-2.5-flash";

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn replay_client(name: &str) -> (Client, Arc<ReplayTransport>) {
    let transport = Arc::new(ReplayTransport::load(fixture(name)).unwrap());
    let client = Client::new(BackendProfile::developer(), transport.clone());
    (client, transport)
}

fn prompt(text: &str) -> GenerateContentParameters {
    GenerateContentParameters::new(MODEL, vec![Content::user(text)])
}

// ---------------------------------------------------------------------------
// Replay-driven tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_replay_returns_interactions_in_order_then_errors() {
    let (client, transport) = replay_client("generate.json");

    let first = client.generate_content(&prompt("one")).await.unwrap();
    assert_eq!(first.text().as_deref(), Some("first"));

    let second = client.generate_content(&prompt("two")).await.unwrap();
    assert_eq!(second.text().as_deref(), Some("second"));
    assert_eq!(
        second.finish_reason(),
        Some(&KnownOrRaw::Known(FinishReason::MaxTokens))
    );
    let citations = &second.candidates[0].citation_metadata.as_ref().unwrap().citations;
    assert_eq!(citations[0].uri.as_deref(), Some("https://example.com/a"));

    match client.generate_content(&prompt("three")).await {
        Err(GenAiError::Transport { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Request contains an invalid argument.");
        }
        other => panic!("expected transport error, got {other:?}"),
    }

    let exhausted = client.generate_content(&prompt("four")).await;
    assert!(matches!(exhausted, Err(GenAiError::Replay { .. })));
    assert_eq!(transport.cursor(), 3);
}

#[tokio::test]
async fn test_configuration_error_never_reaches_transport() {
    let transport = Arc::new(ReplayTransport::new(ReplaySession::default()));
    let client = Client::new(BackendProfile::developer(), transport.clone());

    let params = prompt("hi").with_config(GenerateContentConfig {
        routing_config: Some(RoutingConfig::default()),
        ..GenerateContentConfig::default()
    });
    let err = assert_err!(client.generate_content(&params).await);
    assert_eq!(err.field(), Some("routingConfig"));

    let err = assert_err!(client.generate_content_stream(&params).await);
    assert!(err.is_configuration());
    assert_eq!(transport.cursor(), 0);
}

#[tokio::test]
async fn test_streamed_chat_then_sync_history_order() {
    let (client, _) = replay_client("chat_stream.json");
    let mut chat = client.chat(MODEL, None);

    let mut stream = chat.send_message_stream("My name is Ada.").await.unwrap();
    let mut streamed = String::new();
    while let Some(chunk) = stream.next().await.unwrap() {
        streamed.push_str(&chunk.text().unwrap_or_default());
    }
    drop(stream);
    assert_eq!(streamed, "Hello, Ada.");

    let reply = chat.send_message("What is my name?").await.unwrap();
    assert_eq!(reply.text().as_deref(), Some("You said your name is Ada."));

    let history = chat.history(false);
    let texts: Vec<(Option<&str>, String)> = history
        .iter()
        .map(|c| (c.role(), c.text().unwrap_or_default()))
        .collect();
    assert_eq!(
        texts,
        vec![
            (Some("user"), "My name is Ada.".to_string()),
            (Some("model"), "Hello, Ada.".to_string()),
            (Some("user"), "What is my name?".to_string()),
            (Some("model"), "You said your name is Ada.".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_shared_chat_second_send_waits_for_drain() {
    let (client, _) = replay_client("chat_stream.json");
    let chat = SharedChat::new(client.chat(MODEL, None));

    let mut stream = chat.send_message_stream("My name is Ada.").await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.text().as_deref(), Some("Hello"));

    let second_chat = chat.clone();
    let pending = tokio::spawn(async move { second_chat.send_message("What is my name?").await });
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(!pending.is_finished(), "second send must wait for the stream");

    while stream.next().await.unwrap().is_some() {}
    drop(stream);

    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.text().as_deref(), Some("You said your name is Ada."));

    let history = chat.history(true).await;
    let roles: Vec<_> = history.iter().map(|c| c.role().unwrap_or_default().to_string()).collect();
    assert_eq!(roles, ["user", "model", "user", "model"]);
    assert_eq!(history[1].text().as_deref(), Some("Hello, Ada."));
}

#[tokio::test]
async fn test_closed_stream_is_not_recorded() {
    let (client, _) = replay_client("chat_stream.json");
    let mut chat = client.chat(MODEL, None);

    let mut stream = chat.send_message_stream("My name is Ada.").await.unwrap();
    assert_ok!(stream.next().await);
    stream.close();
    stream.close();
    assert!(matches!(stream.next().await, Err(GenAiError::StreamClosed)));
    drop(stream);

    assert!(chat.history(false).is_empty());
}

#[tokio::test]
async fn test_interaction_stream_resume_after_disconnect() {
    let (client, _) = replay_client("interaction_stream.json");
    let params = CreateInteractionParams::with_model(MODEL, "Tell me a joke");

    let mut events = client.create_interaction_stream(&params).await.unwrap();
    let mut seen = Vec::new();
    let mut last_event_id = None;
    let mut interaction_id = None;
    while let Some(event) = events.next().await.unwrap() {
        if let InteractionEvent::InteractionStart { interaction, .. } = &event {
            interaction_id = interaction.id.clone();
        }
        last_event_id = event.event_id().map(str::to_string);
        seen.push(event.event_type().to_string());
    }
    assert_eq!(seen, ["interaction.start", "content.start", "content.delta"]);
    assert_eq!(last_event_id.as_deref(), Some("evt_3"));
    let interaction_id = interaction_id.unwrap();

    let mut resumed = client
        .resume_interaction_stream(&interaction_id, last_event_id.as_deref())
        .await
        .unwrap();
    let mut rest = Vec::new();
    while let Some(event) = resumed.next().await.unwrap() {
        rest.push(event);
    }
    assert_eq!(rest.len(), 4);
    assert!(rest[2].is_unknown());
    assert_eq!(rest[2].event_type(), "interaction.telemetry");
    match &rest[3] {
        InteractionEvent::InteractionComplete { interaction, event_id } => {
            assert_eq!(
                interaction.status,
                Some(KnownOrRaw::Known(InteractionStatus::Completed))
            );
            assert_eq!(event_id.as_deref(), Some("evt_7"));
        }
        other => panic!("unexpected final event {other:?}"),
    }
    assert!(resumed.is_exhausted());

    let stored = client.get_interaction(&interaction_id).await.unwrap();
    assert_eq!(stored.text().as_deref(), Some("Why did the crab cross?"));
}

#[tokio::test]
async fn test_interactions_rejected_for_cloud_backend() {
    let transport = Arc::new(ReplayTransport::new(ReplaySession::default()));
    let client = Client::new(BackendProfile::cloud("proj", "us-central1"), transport);
    let params = CreateInteractionParams::with_model(MODEL, "hi");
    let err = assert_err!(client.create_interaction_stream(&params).await);
    assert!(err.is_configuration());
}

// ---------------------------------------------------------------------------
// HTTP transport against a local mock server
// ---------------------------------------------------------------------------

const API_KEY: &str = "test-key";

async fn models_handler(
    Path(rest): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": 401, "message": "API key not valid"}})),
        )
            .into_response();
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    match rest.split_once(':') {
        Some((_, "generateContent")) => Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": format!("echo: {prompt}")}]},
                "finishReason": "STOP"
            }],
            "modelVersion": rest.split(':').next().unwrap_or_default()
        }))
        .into_response(),
        Some((_, "streamGenerateContent"))
            if query.get("alt").map(String::as_str) == Some("sse") =>
        {
            let chunks: Vec<Result<Event, Infallible>> = prompt
                .split_whitespace()
                .map(|word| {
                    let chunk = json!({
                        "candidates": [{"content": {"role": "model", "parts": [{"text": format!("{word} ")}]}}]
                    });
                    Ok(Event::default().data(chunk.to_string()))
                })
                .collect();
            Sse::new(futures::stream::iter(chunks)).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": format!("unknown method {rest}")}})),
        )
            .into_response(),
    }
}

async fn interaction_handler(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let after = query.get("last_event_id").cloned().unwrap_or_default();
    let events = vec![
        json!({"event_type": "content.delta", "index": 0, "delta": {"type": "text", "text": format!("resumed {id} after {after}")}}),
        json!({"event_type": "interaction.complete", "interaction": {"id": id, "status": "completed"}}),
    ];
    let stream = futures::stream::iter(events.into_iter().enumerate().map(|(i, e)| {
        Ok::<_, Infallible>(Event::default().id(format!("srv_{i}")).data(e.to_string()))
    }));
    Sse::new(stream).into_response()
}

async fn spawn_mock_server() -> String {
    let app = Router::new()
        .route("/v1beta/models/*rest", post(models_handler))
        .route("/v1beta/interactions/:id", get(interaction_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn http_client(base_url: &str, credentials: Credentials) -> Client {
    let profile = BackendProfile::developer().with_base_url(base_url);
    Client::http(profile, credentials, Duration::from_secs(10)).unwrap()
}

#[tokio::test]
async fn test_http_generate_content() {
    let base = spawn_mock_server().await;
    let client = http_client(&base, Credentials::ApiKey(API_KEY.to_string()));

    let resp = client.generate_content(&prompt("hello there")).await.unwrap();
    assert_eq!(resp.text().as_deref(), Some("echo: hello there"));
    assert_eq!(resp.model_version.as_deref(), Some(MODEL));
}

#[tokio::test]
async fn test_http_stream_generate_content() {
    let base = spawn_mock_server().await;
    let client = http_client(&base, Credentials::ApiKey(API_KEY.to_string()));

    let mut chunks = client
        .generate_content_stream(&prompt("one two three"))
        .await
        .unwrap();
    let mut count = 0;
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await.unwrap() {
        count += 1;
        text.push_str(&chunk.text().unwrap_or_default());
    }
    assert_eq!(count, 3);
    assert_eq!(text, "one two three ");
}

#[tokio::test]
async fn test_http_error_status_carries_message() {
    let base = spawn_mock_server().await;
    let client = http_client(&base, Credentials::ApiKey("wrong".to_string()));

    match client.generate_content(&prompt("hi")).await {
        Err(GenAiError::Transport { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_resume_uses_sse_ids() {
    let base = spawn_mock_server().await;
    let client = http_client(&base, Credentials::None);

    let mut events = client
        .resume_interaction_stream("int_9", Some("evt_3"))
        .await
        .unwrap();
    let first = events.next().await.unwrap().unwrap();
    match &first {
        InteractionEvent::ContentDelta { delta: Some(delta), .. } => {
            assert_eq!(delta.as_text(), Some("resumed int_9 after evt_3"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(first.event_id(), Some("srv_0"));

    let last = events.next().await.unwrap().unwrap();
    assert!(last.is_terminal());
    assert!(events.next().await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires GOOGLE_API_KEY"]
async fn test_live_generate_content() {
    let Ok(key) = std::env::var("GOOGLE_API_KEY") else {
        return;
    };
    let client = Client::http(
        BackendProfile::developer(),
        Credentials::ApiKey(key),
        Duration::from_secs(60),
    )
    .unwrap();
    let resp = client
        .generate_content(&prompt("Reply with the single word: pong"))
        .await
        .unwrap();
    assert!(resp.text().is_some_and(|t| t.to_lowercase().contains("pong")));
}
