//! Practice session management
//!
//! This module provides the `SpeechRoom` abstraction that manages:
//! - The greeting and every child/AI turn
//! - Per-utterance analysis (accuracy, engagement, notes, distress)
//! - Speech-capture state (listening, interim text, error hints)
//! - The report produced when the session ends

mod capture;
mod config;
mod report;
mod room;

pub use capture::{
    assemble, CaptureError, CaptureEvent, RecognitionResult, RecognitionUpdate,
    CAPTURE_FAILED_HINT, NO_SPEECH_HINT,
};
pub use config::SessionData;
pub use report::{
    average_accuracy, dominant_engagement, duration_minutes, SessionRecord, SessionReport,
    DEFAULT_ENGAGEMENT, SUMMARY_FAILED, SUMMARY_PLACEHOLDER,
};
pub use room::{CaptureOutcome, RoomSnapshot, SpeechRoom};
