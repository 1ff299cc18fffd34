//! In-process stub of the transcription backend for integration tests.
//!
//! Tests script its behavior through `Stub` and point a real `ApiClient`
//! at it over loopback HTTP.

// Each test binary uses a different subset of this module
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use meetwatch::live::MonitorConfig;

#[derive(Default)]
pub struct Stub {
    /// Entries served by `GET /api/bot/sessions`.
    pub bot_sessions: Vec<Value>,
    /// Entries served by `GET /api/live/sessions`.
    pub live_sessions: Vec<Value>,
    /// The append-only segment log: (id, speaker label, text).
    pub segments: Vec<(String, String, String)>,
    /// Current speaker mapping; applied to segments as they are served.
    pub mapping: HashMap<String, String>,
    pub speaker_labels: Vec<String>,
    /// Status served once the script below is exhausted.
    pub bot_status: String,
    /// Statuses served one per call; the last entry repeats.
    pub status_script: Vec<String>,
    pub error_message: Option<String>,
    /// Session ids whose segment endpoint answers 404.
    pub gone_sessions: HashSet<String>,
    /// Bot status endpoint answers 404.
    pub bot_status_404: bool,
    /// Mapping saves answer 500.
    pub save_fails: bool,
    /// Dispatch answers 400 with this detail.
    pub dispatch_detail: Option<String>,
    /// Next N segment fetches answer 500, then recover.
    pub segment_failures_remaining: usize,

    // Observations
    pub init_calls: Vec<(String, HashMap<String, String>)>,
    pub status_calls: usize,
    pub save_calls: usize,
    /// `since_id` of every segment fetch, in order.
    pub fetch_log: Vec<Option<String>>,
}

pub type SharedStub = Arc<Mutex<Stub>>;

pub fn new_stub() -> SharedStub {
    Arc::new(Mutex::new(Stub {
        bot_status: "recording".to_string(),
        ..Stub::default()
    }))
}

/// Poll cadences small enough that a test settles in tens of milliseconds.
pub fn fast_config() -> MonitorConfig {
    MonitorConfig {
        segment_poll: Duration::from_millis(20),
        speaker_poll: Duration::from_millis(40),
        clock_tick: Duration::from_millis(15),
    }
}

pub fn bot_session_entry(id: &str) -> Value {
    json!({ "id": id, "status": "recording", "meeting_id": "m-1" })
}

pub fn live_session_entry(id: &str) -> Value {
    json!({ "session_id": id, "meeting_topic": "standup" })
}

fn session_json(session_id: &str, segment_count: usize) -> Value {
    json!({
        "session_id": session_id,
        "meeting_id": "m-1",
        "meeting_topic": "standup",
        "started_at": "2024-01-01T00:00:00",
        "participant_count": 2,
        "segment_count": segment_count,
    })
}

async fn bot_sessions(State(stub): State<SharedStub>) -> Json<Value> {
    let stub = stub.lock().unwrap();
    Json(Value::Array(stub.bot_sessions.clone()))
}

async fn live_sessions(State(stub): State<SharedStub>) -> Json<Value> {
    let stub = stub.lock().unwrap();
    Json(Value::Array(stub.live_sessions.clone()))
}

async fn init_session(
    State(stub): State<SharedStub>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut stub = stub.lock().unwrap();
    stub.init_calls.push((id, query));
    Json(json!({ "status": "ok" }))
}

async fn get_segments(
    State(stub): State<SharedStub>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let mut stub = stub.lock().unwrap();
    if stub.gone_sessions.contains(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    if stub.segment_failures_remaining > 0 {
        stub.segment_failures_remaining -= 1;
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let since = query.get("since_id").cloned();
    stub.fetch_log.push(since.clone());

    // Serve from the since_id row inclusive: the client is expected to
    // deduplicate the overlap at the boundary.
    let start = match &since {
        Some(cursor) => stub
            .segments
            .iter()
            .position(|(sid, _, _)| sid == cursor)
            .unwrap_or(0),
        None => 0,
    };
    let served: Vec<Value> = stub.segments[start..]
        .iter()
        .map(|(sid, label, text)| {
            let name = stub.mapping.get(label).cloned().unwrap_or_else(|| label.clone());
            json!({
                "id": sid,
                "speaker": name,
                "time": "00:00:01",
                "text": text,
                "initials": "SP",
                "colorClass": "bg-blue-500",
            })
        })
        .collect();
    Ok(Json(json!({
        "session": session_json(&id, stub.segments.len()),
        "segments": served,
    })))
}

async fn get_speakers(
    State(stub): State<SharedStub>,
    Path(_id): Path<String>,
) -> Json<Value> {
    let stub = stub.lock().unwrap();
    let speakers: Vec<Value> = stub
        .speaker_labels
        .iter()
        .map(|label| {
            json!({
                "speaker_id": label,
                "label": label,
                "mapped_name": stub.mapping.get(label).cloned().unwrap_or_default(),
            })
        })
        .collect();
    Json(json!({ "speakers": speakers, "mapping": stub.mapping }))
}

async fn put_speakers(
    State(stub): State<SharedStub>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut stub = stub.lock().unwrap();
    stub.save_calls += 1;
    if stub.save_fails {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let mut mapping = HashMap::new();
    if let Some(object) = body.get("mapping").and_then(Value::as_object) {
        for (label, name) in object {
            if let Some(name) = name.as_str() {
                mapping.insert(label.clone(), name.to_string());
            }
        }
    }
    stub.mapping = mapping;
    Ok(Json(json!({ "status": "ok" })))
}

async fn get_bot_status(
    State(stub): State<SharedStub>,
    Path(_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let mut stub = stub.lock().unwrap();
    stub.status_calls += 1;
    if stub.bot_status_404 {
        return Err(StatusCode::NOT_FOUND);
    }
    let status = if stub.status_script.len() > 1 {
        stub.status_script.remove(0)
    } else if let Some(last) = stub.status_script.first() {
        last.clone()
    } else {
        stub.bot_status.clone()
    };
    Ok(Json(json!({
        "status": status,
        "error_message": stub.error_message,
    })))
}

async fn dispatch_bot(
    State(stub): State<SharedStub>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let stub = stub.lock().unwrap();
    if let Some(detail) = &stub.dispatch_detail {
        return Err((StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))));
    }
    let meeting_id = body
        .get("meeting_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Json(json!({
        "session": { "id": "bot-test-1", "status": "joining", "meeting_id": meeting_id }
    })))
}

/// Bind the stub on an ephemeral loopback port and return its base URL.
pub async fn spawn_stub(stub: SharedStub) -> String {
    let app = Router::new()
        .route("/api/bot/sessions", get(bot_sessions))
        .route("/api/live/sessions", get(live_sessions))
        .route("/api/live/segments/{id}/init", post(init_session))
        .route("/api/live/segments/{id}", get(get_segments))
        .route("/api/live/speakers/{id}", get(get_speakers).put(put_speakers))
        .route("/api/bot/{id}/status", get(get_bot_status))
        .route("/api/bot/dispatch", post(dispatch_bot))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Poll `cond` every 10ms, panicking after two seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}
