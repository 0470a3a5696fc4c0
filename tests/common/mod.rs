//! Local stand-ins for the event API and the chat webhook

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::Value;

pub type Responder = Arc<dyn Fn(i64) -> (StatusCode, String) + Send + Sync>;

/// One request received by the fake event API
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub after_event_id: i64,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct ApiState {
    responder: Responder,
    requests: Arc<Mutex<Vec<RecordedSearch>>>,
}

pub struct FakeEventApi {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RecordedSearch>>>,
}

impl FakeEventApi {
    pub fn cursors(&self) -> Vec<i64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.after_event_id)
            .collect()
    }
}

async fn search_handler(
    State(state): State<ApiState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let after_event_id = query
        .get("after_event_id")
        .and_then(|v| v.parse().ok())
        .unwrap_or(-1);

    state.requests.lock().unwrap().push(RecordedSearch {
        after_event_id,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    (state.responder)(after_event_id)
}

/// Start a fake event search API. `respond` maps the requested cursor to a reply.
pub async fn spawn_event_api<F>(respond: F) -> FakeEventApi
where
    F: Fn(i64) -> (StatusCode, String) + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = ApiState {
        responder: Arc::new(respond),
        requests: requests.clone(),
    };

    let app = Router::new()
        .route("/api/v1/events/search/", post(search_handler))
        .with_state(state);

    FakeEventApi {
        base_url: serve(app).await,
        requests,
    }
}

/// One request received by the fake webhook
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct HookState {
    status: StatusCode,
    posts: Arc<Mutex<Vec<RecordedPost>>>,
}

pub struct FakeWebhook {
    pub url: String,
    pub posts: Arc<Mutex<Vec<RecordedPost>>>,
}

impl FakeWebhook {
    /// The `event_data` text of every post, parsed back into JSON
    pub fn delivered_events(&self) -> Vec<Value> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|p| {
                let text = p.body["event_data"].as_str().expect("event_data is text");
                serde_json::from_str(text).expect("event_data is JSON")
            })
            .collect()
    }
}

async fn hook_handler(State(state): State<HookState>, headers: HeaderMap, body: String) -> StatusCode {
    state.posts.lock().unwrap().push(RecordedPost {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    state.status
}

/// Start a fake webhook answering every post with `status`
pub async fn spawn_webhook(status: StatusCode) -> FakeWebhook {
    let posts = Arc::new(Mutex::new(Vec::new()));
    let state = HookState {
        status,
        posts: posts.clone(),
    };

    let app = Router::new()
        .route("/hook", post(hook_handler))
        .with_state(state);

    FakeWebhook {
        url: format!("{}/hook", serve(app).await),
        posts,
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{}", addr)
}

/// JSON body of one search page
pub fn page(events: Value, last_id: Option<i64>) -> String {
    serde_json::json!({ "events": events, "last_id": last_id }).to_string()
}
