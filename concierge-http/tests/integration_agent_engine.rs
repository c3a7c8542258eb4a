//! Agent Engine client against a local stand-in for the REST API.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use concierge_http::agent::vertex::{AgentEngineConfig, AgentEngineService};
use concierge_http::agent::RemoteAgentService;
use concierge_http::AgentError;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const ENGINE: &str = "projects/p/locations/us-central1/reasoningEngines/42";

#[derive(Clone, Default)]
struct FakeEngine {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    authorization: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    fn record(&self, headers: &HeaderMap, method: &str, body: Value) {
        if let Some(auth) = headers.get("authorization") {
            self.authorization.lock().unwrap().push(auth.to_str().unwrap().to_string());
        }
        self.requests.lock().unwrap().push((method.to_string(), body));
    }
}

async fn describe(Path(id): Path<String>) -> Response {
    if id == "42" {
        Json(json!({ "name": ENGINE, "displayName": "concierge" })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Handles both `42:query` and `42:streamQuery`, which axum sees as one path segment
async fn invoke(
    State(engine): State<FakeEngine>,
    Path(method): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    engine.record(&headers, &method, body.clone());
    match method.as_str() {
        "42:query" => Json(json!({
            "output": {
                "id": "remote-session-1",
                "user_id": body["input"]["user_id"],
                "app_name": "concierge",
                "state": {}
            }
        }))
        .into_response(),
        "42:streamQuery" => {
            let message = body["input"]["message"].as_str().unwrap_or_default();
            if message == "fail" {
                return (StatusCode::INTERNAL_SERVER_ERROR, "quota exhausted").into_response();
            }
            let events = [
                json!({ "content": { "parts": [{ "text": "Hello " }], "role": "model" }, "author": "concierge" }),
                json!({ "content": { "parts": [{ "function_call": { "name": "search" } }] } }),
                json!({ "content": { "parts": [{ "text": "traveler" }] } }),
            ];
            // Split mid-line to exercise buffering across chunks
            let body: String = events.iter().map(|e| format!("{}\n", e)).collect();
            let (head, tail) = body.split_at(body.len() / 2);
            let chunks: Vec<Result<String, std::io::Error>> = vec![Ok(head.to_string()), Ok(tail.to_string())];
            Response::new(Body::from_stream(futures::stream::iter(chunks)))
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_engine() -> (String, FakeEngine) {
    let engine = FakeEngine::default();
    let app = Router::new()
        .route("/v1/projects/p/locations/us-central1/reasoningEngines/{id}", get(describe).post(invoke))
        .with_state(engine.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), engine)
}

fn service(endpoint: &str) -> AgentEngineService {
    AgentEngineService::new(AgentEngineConfig {
        endpoint: Some(endpoint.to_string()),
        access_token: Some("test-token".into()),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_creates_session_and_streams_reply() {
    let (endpoint, engine) = spawn_engine().await;
    let agents = service(&endpoint);

    let deployment = agents.get_deployment(ENGINE).await.unwrap();
    assert_eq!(deployment.resource_id(), ENGINE);

    let session = deployment.create_session("traveler0115").await.unwrap();
    assert_eq!(session.id, "remote-session-1");
    assert_eq!(session.user_id, "traveler0115");

    let fragments: Vec<_> = deployment
        .stream_query("traveler0115", &session.id, "Hello bot")
        .await
        .unwrap()
        .collect()
        .await;
    let texts: Vec<String> = fragments
        .into_iter()
        .flat_map(|f| f.unwrap().into_answer_parts())
        .filter_map(|p| p.text)
        .collect();
    assert_eq!(texts, vec!["Hello ", "traveler"]);

    let requests = engine.requests.lock().unwrap().clone();
    assert_eq!(requests[0].0, "42:query");
    assert_eq!(requests[0].1["class_method"], "create_session");
    assert_eq!(requests[1].0, "42:streamQuery");
    assert_eq!(requests[1].1["class_method"], "stream_query");
    assert_eq!(requests[1].1["input"]["session_id"], "remote-session-1");
    assert_eq!(requests[1].1["input"]["message"], "Hello bot");
    assert!(engine
        .authorization
        .lock()
        .unwrap()
        .iter()
        .all(|auth| auth == "Bearer test-token"));
}

#[tokio::test]
async fn test_unknown_deployment_is_not_found() {
    let (endpoint, _engine) = spawn_engine().await;
    let agents = service(&endpoint);

    let err = agents
        .get_deployment("projects/p/locations/us-central1/reasoningEngines/7")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AgentError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_query_surfaces_status_and_body() {
    let (endpoint, _engine) = spawn_engine().await;
    let deployment = service(&endpoint).get_deployment(ENGINE).await.unwrap();

    let err = deployment.stream_query("u", "s", "fail").await.err().unwrap();
    match err {
        AgentError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "quota exhausted");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
