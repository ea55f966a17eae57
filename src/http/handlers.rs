use super::state::AppState;
use crate::app::{spawn_summary, Screen};
use crate::conversation::PlayedClip;
use crate::session::{CaptureEvent, CaptureOutcome, SessionData, SessionReport, SpeechRoom};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Vocabulary as a list or as comma-separated text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VocabularyInput {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub topic: String,
    pub vocabulary: VocabularyInput,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub status: String,
    pub topic: String,
    pub vocabulary: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub screen: Screen,
    pub session_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub status: String,
    /// Finished utterance handed to the conversation, if any
    pub utterance: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListeningResponse {
    pub listening: bool,
}

#[derive(Debug, Serialize)]
pub struct ClipListResponse {
    pub clips: Vec<PlayedClip>,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<SessionReport>,
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn current_room(state: &AppState) -> Result<Arc<SpeechRoom>, Response> {
    state
        .app
        .read()
        .await
        .room()
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No session is running"))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /screen
pub async fn get_screen(State(state): State<AppState>) -> impl IntoResponse {
    let app = state.app.read().await;
    Json(ScreenResponse {
        screen: app.screen(),
        session_active: app.room().is_some(),
    })
}

/// POST /intro/start
/// Leave the welcome page
pub async fn enter_management(State(state): State<AppState>) -> impl IntoResponse {
    let mut app = state.app.write().await;
    app.enter_management();
    Json(ScreenResponse {
        screen: app.screen(),
        session_active: app.room().is_some(),
    })
}

/// POST /sessions
/// Start a new speech room; the greeting is generated in the background
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Response {
    let data = match req.vocabulary {
        VocabularyInput::List(words) => SessionData::new(req.topic, words),
        VocabularyInput::Text(text) => SessionData::parse(&req.topic, &text),
    };
    let data = match data {
        Ok(data) => data,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let mut app = state.app.write().await;
    if app.room().is_some() {
        return error_response(StatusCode::CONFLICT, "A session is already running");
    }

    let room = match state.open_room(data.clone()) {
        Ok(room) => room,
        Err(e) => {
            error!("Failed to open speech room: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to open speech room: {}", e),
            );
        }
    };

    if let Err(e) = app.start_session(Arc::clone(&room)) {
        return error_response(StatusCode::CONFLICT, e.to_string());
    }
    drop(app);

    tokio::spawn(async move { room.start().await });

    info!("Speech room started for topic: {}", data.topic);

    (
        StatusCode::CREATED,
        Json(StartSessionResponse {
            status: "started".to_string(),
            topic: data.topic,
            vocabulary: data.vocabulary,
        }),
    )
        .into_response()
}

/// GET /sessions/current
/// Transcript and status flags of the running room
pub async fn get_current_session(State(state): State<AppState>) -> Response {
    match current_room(&state).await {
        Ok(room) => Json(room.snapshot().await).into_response(),
        Err(response) => response,
    }
}

/// POST /sessions/current/messages
/// Typed message; the AI turn runs in the background
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let room = match current_room(&state).await {
        Ok(room) => room,
        Err(response) => return response,
    };

    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message is empty");
    }

    match room.accept_text(&req.text) {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                status: "accepted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Message refused: {}", e);
            error_response(StatusCode::CONFLICT, e.to_string())
        }
    }
}

/// POST /sessions/current/capture
/// Event from the speech recognizer
pub async fn capture_event(
    State(state): State<AppState>,
    Json(event): Json<CaptureEvent>,
) -> Response {
    let room = match current_room(&state).await {
        Ok(room) => room,
        Err(response) => return response,
    };

    let (status, utterance) = match room.handle_capture(event).await {
        CaptureOutcome::Updated => ("ok", None),
        CaptureOutcome::Utterance(text) => ("ok", Some(text)),
        CaptureOutcome::Busy(_) => ("busy", None),
    };

    Json(CaptureResponse {
        status: status.to_string(),
        utterance,
    })
    .into_response()
}

/// POST /sessions/current/listening
/// Mic button
pub async fn toggle_listening(State(state): State<AppState>) -> Response {
    let room = match current_room(&state).await {
        Ok(room) => room,
        Err(response) => return response,
    };

    match room.toggle_listening().await {
        Ok(listening) => Json(ListeningResponse { listening }).into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, e.to_string()),
    }
}

/// GET /sessions/current/clips
/// Sentences spoken so far, in playback order
pub async fn list_clips(State(state): State<AppState>) -> Response {
    match current_room(&state).await {
        Ok(room) => Json(ClipListResponse {
            clips: room.clips().await,
        })
        .into_response(),
        Err(response) => response,
    }
}

/// GET /sessions/current/clips/:seq
/// Audio of one spoken sentence as WAV
pub async fn get_clip(State(state): State<AppState>, Path(seq): Path<u64>) -> Response {
    let room = match current_room(&state).await {
        Ok(room) => room,
        Err(response) => return response,
    };

    match room.clip_wav(seq).await {
        Some(Ok(bytes)) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        Some(Err(e)) => {
            error!("Failed to encode clip {}: {:#}", seq, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode clip")
        }
        None => error_response(StatusCode::NOT_FOUND, format!("Clip {} has not played", seq)),
    }
}

/// POST /sessions/current/end
/// End the session; the summary is generated in the background
pub async fn end_session(State(state): State<AppState>) -> Response {
    let report = {
        let mut app = state.app.write().await;
        match app.end_session().await {
            Ok(report) => report,
            Err(e) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
        }
    };

    info!("Session ended, report {}", report.id);
    spawn_summary(Arc::clone(&state.app), state.ai.clone(), &report);

    (StatusCode::OK, Json(report)).into_response()
}

/// GET /reports
pub async fn list_reports(State(state): State<AppState>) -> impl IntoResponse {
    let app = state.app.read().await;
    Json(ReportListResponse {
        reports: app.reports().to_vec(),
        selected: app.selected_id().map(str::to_string),
    })
}

/// GET /reports/:report_id
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Response {
    let app = state.app.read().await;
    match app.report(&report_id) {
        Some(report) => Json(report.clone()).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Report {} not found", report_id),
        ),
    }
}

/// DELETE /reports/:report_id
pub async fn delete_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Response {
    let mut app = state.app.write().await;
    if app.delete_report(&report_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Report {} not found", report_id),
        )
    }
}

/// POST /reports/:report_id/select
pub async fn select_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Response {
    let mut app = state.app.write().await;
    match app.select_report(&report_id) {
        Ok(report) => Json(report.clone()).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// PUT /reports/:report_id/summary
/// Edit the evaluation text by hand
pub async fn update_summary(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(req): Json<SummaryRequest>,
) -> Response {
    let mut app = state.app.write().await;
    if !app.set_summary(&report_id, req.summary) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Report {} not found", report_id),
        );
    }
    match app.report(&report_id) {
        Some(report) => Json(report.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Report disappeared"),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
