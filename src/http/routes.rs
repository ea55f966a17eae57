use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Navigation
        .route("/screen", get(handlers::get_screen))
        .route("/intro/start", post(handlers::enter_management))
        // Speech room
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/current", get(handlers::get_current_session))
        .route("/sessions/current/messages", post(handlers::send_message))
        .route("/sessions/current/capture", post(handlers::capture_event))
        .route("/sessions/current/listening", post(handlers::toggle_listening))
        .route("/sessions/current/clips", get(handlers::list_clips))
        .route("/sessions/current/clips/:seq", get(handlers::get_clip))
        .route("/sessions/current/end", post(handlers::end_session))
        // Reports
        .route("/reports", get(handlers::list_reports))
        .route(
            "/reports/:report_id",
            get(handlers::get_report).delete(handlers::delete_report),
        )
        .route("/reports/:report_id/select", post(handlers::select_report))
        .route("/reports/:report_id/summary", put(handlers::update_summary))
        // Browser front ends live on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
