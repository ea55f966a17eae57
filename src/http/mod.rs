//! HTTP API server for the browser front end
//!
//! This module exposes the app over REST:
//! - GET /screen, POST /intro/start - Navigation
//! - POST /sessions - Start a speech room
//! - GET /sessions/current - Transcript and status flags
//! - POST /sessions/current/messages - Typed message
//! - POST /sessions/current/capture - Speech recognizer event
//! - POST /sessions/current/listening - Mic toggle
//! - POST /sessions/current/end - End the session, returns the report
//! - GET/DELETE /reports/:id, POST /reports/:id/select, PUT /reports/:id/summary
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
