//! The tracking daemon: minute tick plus HTTP API.
//!
//! One periodic thread drives the reminder scheduler; axum serves the
//! status/control API on the configured port. All state mutation funnels
//! through the shared [`Tracker`], which serializes callers internally, so
//! HTTP handlers, the tick thread, and prompt threads interleave only at
//! whole-operation granularity.
//!
//! The CORS layer is permissive because media events arrive from a browser
//! userscript on video pages.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use deskwell_core::presence::keyring_store;
use deskwell_core::{
    ActivitySampler, Clock, Config, Database, EventKind, EventRecord, EventSink, GraphPresence,
    ReminderScheduler, SessionKind, SqliteEventSink, SystemClock, Tracker,
};

use crate::prompter::{CommandConfirmer, CommandPrompter};

const TICK_PERIOD: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct AppState {
    tracker: Arc<Tracker>,
    sampler: Arc<ActivitySampler>,
    scheduler: Arc<ReminderScheduler>,
    sink: Arc<SqliteEventSink>,
    clock: Arc<dyn Clock>,
}

pub fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load()?;
    let port = port.unwrap_or(config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sink = Arc::new(SqliteEventSink::new(Database::open()?));
    let tracker = Arc::new(Tracker::with_clock(
        config.timing.break_free_min,
        clock.clone(),
    ));
    let sampler = Arc::new(ActivitySampler::new(
        tracker.clone(),
        sink.clone(),
        clock.clone(),
    ));

    let token = keyring_store::get(keyring_store::GRAPH_TOKEN_KEY).unwrap_or_else(|err| {
        warn!(%err, "keyring unavailable, presence probe disabled");
        None
    });
    let presence = Arc::new(GraphPresence::with_endpoint(
        config.presence.graph_presence_url.clone(),
        token,
    ));

    let prompter = Arc::new(CommandPrompter::new(config.prompts.clone(), sink.clone()));
    let confirmer = Arc::new(CommandConfirmer::new(
        config.prompts.end_of_day_command.clone(),
    ));

    let scheduler = Arc::new(ReminderScheduler::new(
        &config.timing,
        tracker.clone(),
        sampler.clone(),
        presence,
        prompter,
        confirmer,
        sink.clone(),
        clock.clone(),
    ));

    // Minute tick on a plain thread; the first tick fires immediately.
    {
        let scheduler = scheduler.clone();
        thread::spawn(move || loop {
            scheduler.tick();
            thread::sleep(TICK_PERIOD);
        });
    }

    let state = AppState {
        tracker,
        sampler,
        scheduler,
        sink,
        clock,
    };

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/start", post(post_start))
        .route("/end", post(post_end))
        .route("/event", post(post_event))
        .route("/input", post(post_input))
        .route("/events", get(get_events))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("deskwell listening on http://{addr}");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await
    })?;
    Ok(())
}

async fn get_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.tracker.status();
    let target = state.scheduler.target_minutes();
    let remaining = ((target - status.work_minutes).max(0.0) * 10.0).round() / 10.0;
    let mut value = serde_json::to_value(&status).unwrap_or_else(|_| json!({}));
    value["target_minutes"] = json!(target);
    value["remaining_minutes"] = json!(remaining);
    Json(value)
}

async fn post_start(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.tracker.start_work();
    state.sink.record(EventRecord::new(
        EventKind::StartWork,
        "manual",
        snapshot,
        state.clock.now(),
    ));
    Json(json!({ "ok": true }))
}

async fn post_end(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.tracker.end_work();
    state.sink.record(EventRecord::new(
        EventKind::EndWork,
        "manual",
        snapshot,
        state.clock.now(),
    ));
    Json(json!({ "ok": true }))
}

#[derive(Deserialize)]
struct EventBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    details: String,
}

async fn post_event(
    State(state): State<AppState>,
    Json(body): Json<EventBody>,
) -> (StatusCode, Json<Value>) {
    let (snapshot, kind) = match body.kind.as_str() {
        "media_start" => (
            state.tracker.break_start(SessionKind::Media),
            EventKind::MediaStart,
        ),
        "media_stop" => (
            state.tracker.break_end(SessionKind::Media),
            EventKind::MediaStop,
        ),
        "break_start" => (
            state.tracker.break_start(SessionKind::Generic),
            EventKind::BreakStart,
        ),
        "break_end" => (
            state.tracker.break_end(SessionKind::Generic),
            EventKind::BreakEnd,
        ),
        // Lock/unlock arrive from an external session watcher; the sampler
        // logs these itself.
        "lock" => {
            state.sampler.on_lock();
            return (StatusCode::OK, Json(json!({ "ok": true })));
        }
        "unlock" => {
            state.sampler.on_unlock();
            return (StatusCode::OK, Json(json!({ "ok": true })));
        }
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": format!("unknown event type: {other}") })),
            );
        }
    };
    state.sink.record(EventRecord::new(
        kind,
        body.details,
        snapshot,
        state.clock.now(),
    ));
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn post_input(State(state): State<AppState>) -> Json<Value> {
    state.sampler.notify_input(state.clock.now());
    Json(json!({ "ok": true }))
}

#[derive(Deserialize)]
struct EventsQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> (StatusCode, Json<Value>) {
    match state.sink.with(|db| db.recent_events(query.limit)) {
        Ok(events) => (StatusCode::OK, Json(json!({ "events": events }))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": err.to_string() })),
        ),
    }
}
