//! Streaming conversation pipeline
//!
//! - `segmenter`: streamed text to sentences
//! - `playback`: ordered, one-at-a-time clip playback
//! - `orchestrator`: one AI turn from generation to playback
//! - `transcript`: chat messages and room events

pub mod orchestrator;
pub mod playback;
pub mod segmenter;
pub mod transcript;

pub use orchestrator::{Orchestrator, TurnOutcome};
pub use playback::{PlaybackQueue, PlaybackStatus, PlaybackTicket, PlayedClip};
pub use segmenter::{Sentence, SentenceSegmenter};
pub use transcript::{ChatMessage, RoomEvent, Speaker, Transcript};
