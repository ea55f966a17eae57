use crate::ai::AiServices;
use crate::app::App;
use crate::audio::AudioSinkFactory;
use crate::config::AudioConfig;
use crate::session::{SessionData, SpeechRoom};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Screens, active room and reports
    pub app: Arc<RwLock<App>>,

    /// Model-backed collaborators
    pub ai: AiServices,

    /// Where rooms send their audio
    pub audio: AudioConfig,

    /// Stream replies fragment by fragment
    pub streaming: bool,
}

impl AppState {
    pub fn new(ai: AiServices, audio: AudioConfig, streaming: bool) -> Self {
        Self {
            app: Arc::new(RwLock::new(App::new())),
            ai,
            audio,
            streaming,
        }
    }

    /// Open a room whose clips land in their own folder under the output directory
    pub fn open_room(&self, data: SessionData) -> Result<Arc<SpeechRoom>> {
        let audio = self.audio.for_run("session");
        let sink = AudioSinkFactory::create(&audio)?;
        Ok(SpeechRoom::open(
            data,
            self.ai.clone(),
            sink,
            audio.sample_rate,
            self.streaming,
        ))
    }
}
