use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dance_avatar_core::{
    catalog::{MoveCatalog, StyleCatalog},
    stream::{self, ServerMessage, ViewerConnection},
    timeline::MoveSchedule,
    transport::TransportAck,
    AppConfig, AssetStore, CoachingReport, DanceError, LiveStreamer, MusicTrack, ScoreRequest,
    StyleProfile, Timeline, TransportController, TransportStatus,
};
use serde_json::{json, Value};
use tokio::time::{self, Instant, MissedTickBehavior};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Shared by every handler. The transport and timeline are built once at
/// startup and never replaced.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub transport: Arc<TransportController>,
    pub timeline: Arc<Timeline>,
    pub assets: Arc<AssetStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let schedule = MoveSchedule::catalog(config.timeline.move_duration_seconds);
        let timeline = Timeline::build_with(
            config.timeline.total_duration_seconds,
            &schedule,
            config.stream.frame_rate,
        );
        tracing::info!(
            frames = timeline.len(),
            seconds = timeline.duration(),
            "sequence timeline ready"
        );

        Self {
            assets: Arc::new(AssetStore::from_config(&config.assets)),
            config: Arc::new(config),
            transport: Arc::new(TransportController::new()),
            timeline: Arc::new(timeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.assets.static_dir);
    let music_dir = ServeDir::new(&state.config.assets.music_dir);

    Router::new()
        .route("/health", get(health))
        .route("/api/styles", get(styles))
        .route("/api/moves", get(moves))
        .route("/api/style/:name", get(style_profile))
        .route("/api/music", get(music))
        .route("/api/play/:music_id", post(play))
        .route("/api/pause", post(pause))
        .route("/api/resume", post(resume))
        .route("/api/reset", post(reset))
        .route("/api/status", get(status))
        .route("/api/coaching/analyze", post(analyze))
        .route("/models/:name", get(model))
        .route("/ws/dance", get(dance_session))
        .route("/ws/dance/stream", get(dance_stream))
        .route("/ws", get(synced_viewer))
        .nest_service("/static", static_dir)
        .nest_service("/music", music_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: AppConfig) -> dance_avatar_core::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .map_err(|err| DanceError::InvalidConfig(format!("bind address: {err}")))?;

    let state = AppState::new(config);
    tokio::spawn(run_clock(state.transport.clone(), state.config.stream.frame_interval()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dance avatar server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Advances the shared playhead by measured wall time once per frame.
async fn run_clock(transport: Arc<TransportController>, period: time::Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f32();
        last = now;
        if let Err(err) = transport.advance(delta) {
            tracing::error!(%err, "transport clock stopped");
            return;
        }
    }
}

/// Maps core errors onto HTTP responses: missing assets are 404s, anything
/// else is a 500.
pub struct ApiError(DanceError);

impl From<DanceError> for ApiError {
    fn from(err: DanceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!(err = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn styles() -> Json<Vec<&'static str>> {
    Json(StyleCatalog::list_style_ids())
}

async fn moves() -> Json<Vec<&'static str>> {
    Json(MoveCatalog::list_move_ids())
}

async fn style_profile(Path(name): Path<String>) -> ApiResult<StyleProfile> {
    StyleCatalog::profile(&name)
        .map(Json)
        .ok_or_else(|| DanceError::asset_missing("style", name).into())
}

async fn music(State(state): State<AppState>) -> ApiResult<Vec<MusicTrack>> {
    Ok(Json(state.assets.tracks()?))
}

async fn play(
    State(state): State<AppState>,
    Path(music_id): Path<String>,
) -> ApiResult<TransportAck> {
    let track = state.assets.track(&music_id)?;
    let transition = state.transport.play(track.id)?;
    Ok(Json(transition.ack))
}

async fn pause(State(state): State<AppState>) -> ApiResult<TransportAck> {
    Ok(Json(state.transport.pause()?.ack))
}

async fn resume(State(state): State<AppState>) -> ApiResult<TransportAck> {
    Ok(Json(state.transport.resume()?.ack))
}

async fn reset(State(state): State<AppState>) -> ApiResult<TransportAck> {
    Ok(Json(state.transport.reset()?.ack))
}

async fn status(State(state): State<AppState>) -> ApiResult<TransportStatus> {
    Ok(Json(state.transport.status()?))
}

async fn analyze(Json(request): Json<ScoreRequest>) -> Json<CoachingReport> {
    Json(request.evaluate())
}

async fn model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.assets.resolve_model(&name)?;
    let bytes = tokio::fs::read(&path).await.map_err(DanceError::from)?;
    let content_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("glb") => "model/gltf-binary",
        Some("gltf") => "model/gltf+json",
        _ => "application/octet-stream",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

async fn dance_session(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut conn = SocketConnection::new(socket);
        let mut streamer = LiveStreamer::new(state.config.stream.clone());
        match streamer.run_session(&mut conn).await {
            Ok(outcome) => tracing::debug!(?outcome, "session socket finished"),
            Err(err) => tracing::warn!(%err, "session socket failed"),
        }
    })
}

async fn dance_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut conn = SocketConnection::new(socket);
        let mut streamer = LiveStreamer::new(state.config.stream.clone());
        match streamer.run_stream(&mut conn).await {
            Ok(outcome) => tracing::debug!(?outcome, "stream socket finished"),
            Err(err) => tracing::warn!(%err, "stream socket failed"),
        }
    })
}

async fn synced_viewer(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut conn = SocketConnection::new(socket);
        let result = stream::run_synced(
            &mut conn,
            &state.transport,
            &state.timeline,
            &state.config.stream,
        )
        .await;
        match result {
            Ok(outcome) => tracing::debug!(?outcome, "synced socket finished"),
            Err(err) => tracing::warn!(%err, "synced socket failed"),
        }
    })
}

/// Adapts an axum socket to the streaming loops. Binary frames and pings are
/// skipped; a close frame or a transport error reads as a disconnect.
struct SocketConnection {
    socket: WebSocket,
}

impl SocketConnection {
    fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl ViewerConnection for SocketConnection {
    async fn send(&mut self, message: &ServerMessage) -> dance_avatar_core::Result<()> {
        let json = message.to_json()?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| DanceError::Disconnected)
    }

    async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.send(Message::Close(None)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let mut config = AppConfig::default();
        config.timeline.total_duration_seconds = 4.0;
        config.assets.music_dir = "/nonexistent/music".to_string();
        config.assets.models_dir = "/nonexistent/models".to_string();
        AppState::new(config)
    }

    #[tokio::test]
    async fn lists_catalogs() {
        assert_eq!(styles().await.0.len(), 5);
        assert_eq!(moves().await.0[0], "moonwalk");
        assert_eq!(health().await.0["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_style_profile_is_not_found() {
        let Json(profile) = style_profile(Path("salsa".to_string())).await.ok().unwrap();
        assert_eq!(profile.display_color, "#06D6A0");

        let response = style_profile(Path("waltz".to_string()))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn playing_a_missing_track_is_not_found() {
        let state = state();
        let response = play(State(state.clone()), Path("ghost".to_string()))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!state.transport.status().unwrap().music_playing);
    }

    #[tokio::test]
    async fn transport_routes_drive_the_shared_clock() {
        let state = state();
        state.transport.play("warmup").unwrap();
        state.transport.advance(1.0).unwrap();

        let Json(ack) = pause(State(state.clone())).await.ok().unwrap();
        assert_eq!(
            ack,
            TransportAck::Paused {
                status: "paused",
                pause_time: 1.0
            }
        );
        let Json(snapshot) = status(State(state.clone())).await.ok().unwrap();
        assert!(snapshot.is_paused);

        resume(State(state.clone())).await.ok().unwrap();
        let Json(ack) = reset(State(state.clone())).await.ok().unwrap();
        assert_eq!(
            ack,
            TransportAck::Reset {
                status: "reset",
                pose: "idle"
            }
        );
        assert_eq!(state.transport.status().unwrap().current_music, None);
    }

    #[tokio::test]
    async fn coaching_uses_descriptor_text() {
        let request: ScoreRequest = serde_json::from_str(
            r#"{"videoContext":"hip hop basics","userPerformance":"accuracy was 55% overall"}"#,
        )
        .unwrap();
        let Json(report) = analyze(Json(request)).await;
        assert_eq!(report.score, 55);
        assert!(report.feedback.starts_with("Good progress"));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_advances_only_while_playing() {
        let transport = Arc::new(TransportController::new());
        let clock = tokio::spawn(run_clock(
            transport.clone(),
            time::Duration::from_secs_f32(1.0 / 30.0),
        ));

        transport.play("warmup").unwrap();
        time::sleep(time::Duration::from_secs(1)).await;
        let played = transport.state().unwrap().current_time();
        assert!((played - 1.0).abs() < 0.05, "{played}");

        transport.pause().unwrap();
        let paused_at = transport.state().unwrap().current_time();
        time::sleep(time::Duration::from_secs(1)).await;
        assert_eq!(transport.state().unwrap().current_time(), paused_at);

        transport.resume().unwrap();
        time::sleep(time::Duration::from_millis(500)).await;
        let resumed = transport.state().unwrap().current_time();
        assert!((resumed - paused_at - 0.5).abs() < 0.05, "{resumed}");

        clock.abort();
    }

    #[tokio::test]
    async fn missing_model_is_not_found() {
        let response = model(State(state()), Path("avatar.glb".to_string()))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
