pub mod ai;
pub mod app;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod http;
pub mod session;

pub use ai::{AiServices, GeminiClient, HistoryEntry, Role, SpeechAnalysis, SynthesizedAudio};
pub use app::{spawn_summary, App, Screen};
pub use audio::{AudioClip, AudioSink, AudioSinkFactory, NullSink, PcmBuffer, WavFileSink};
pub use config::Config;
pub use conversation::{
    ChatMessage, Orchestrator, PlaybackQueue, PlaybackTicket, RoomEvent, Sentence,
    SentenceSegmenter, Speaker, Transcript, TurnOutcome,
};
pub use http::{create_router, AppState};
pub use session::{SessionData, SessionReport, SpeechRoom};
