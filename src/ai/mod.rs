//! Generative-AI collaborators
//!
//! The conversation needs four capabilities from the model provider: text
//! generation (whole or streamed), speech synthesis, analysis of the child's
//! utterance and the end-of-session summary. Each is a trait so tests and
//! other providers can stand in for [`GeminiClient`]. [`AiServices`] bundles
//! them and applies the fixed fallbacks, so callers never see a failure for
//! anything but synthesis and streaming.

pub mod fallback;
pub mod gemini;
pub mod messages;
pub mod prompts;
pub mod sse;

use std::sync::Arc;

use anyhow::Result;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::conversation::ChatMessage;

pub use gemini::GeminiClient;

/// Reply text arriving piece by piece
pub type FragmentStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of history as the text generator sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub role: Role,
}

/// Encoded speech for one sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Base64 PCM
    pub data: String,
    pub mime_type: Option<String>,
}

/// Assessment of one child utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechAnalysis {
    /// 0 to 100
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub engagement: String,
    #[serde(default)]
    pub psychological_note: String,
    #[serde(default)]
    pub is_distressed: bool,
}

impl SpeechAnalysis {
    pub fn fallback() -> Self {
        Self {
            accuracy: fallback::ANALYSIS_ACCURACY,
            engagement: fallback::ANALYSIS_ENGAGEMENT.to_string(),
            psychological_note: fallback::ANALYSIS_NOTE.to_string(),
            is_distressed: false,
        }
    }

    /// Keep the score inside 0..=100 whatever the model returned
    pub fn clamped(mut self) -> Self {
        self.accuracy = if self.accuracy.is_finite() {
            self.accuracy.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self
    }
}

/// Input for the end-of-session evaluation
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest {
    pub topic: String,
    pub conversation: Vec<ChatMessage>,
    pub notes: Vec<String>,
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Opening line of a session
    async fn greeting(&self, topic: &str, vocabulary: &[String]) -> Result<String>;

    /// Whole reply in one call; `history` is never empty
    async fn reply(&self, history: &[HistoryEntry], topic: &str, vocabulary: &[String])
        -> Result<String>;

    /// Reply as a stream of fragments; `history` is never empty
    async fn reply_stream(
        &self,
        history: &[HistoryEntry],
        topic: &str,
        vocabulary: &[String],
    ) -> Result<FragmentStream>;
}

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak one non-empty sentence; errors when the service returns no audio
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}

#[async_trait::async_trait]
pub trait SpeechAnalyzer: Send + Sync {
    async fn analyze(&self, conversation: &[ChatMessage], utterance: &str)
        -> Result<SpeechAnalysis>;
}

#[async_trait::async_trait]
pub trait SessionSummarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}

/// The four collaborators, with call-site fallbacks applied
#[derive(Clone)]
pub struct AiServices {
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub analyzer: Arc<dyn SpeechAnalyzer>,
    pub summarizer: Arc<dyn SessionSummarizer>,
}

impl AiServices {
    /// Use one provider for everything
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: TextGenerator + SpeechSynthesizer + SpeechAnalyzer + SessionSummarizer + 'static,
    {
        Self {
            generator: provider.clone(),
            synthesizer: provider.clone(),
            analyzer: provider.clone(),
            summarizer: provider,
        }
    }

    pub async fn greeting(&self, topic: &str, vocabulary: &[String]) -> String {
        match self.generator.greeting(topic, vocabulary).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback::GREETING_ON_EMPTY.to_string(),
            Err(e) => {
                error!("Error generating initial greeting: {:#}", e);
                fallback::GREETING_ON_ERROR.to_string()
            }
        }
    }

    pub async fn reply(&self, history: &[HistoryEntry], topic: &str, vocabulary: &[String]) -> String {
        let history = usable_history(history);
        if history.is_empty() {
            warn!("Reply requested with empty history");
            return fallback::REPLY_ON_EMPTY_HISTORY.to_string();
        }
        match self.generator.reply(&history, topic, vocabulary).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback::REPLY_ON_EMPTY.to_string(),
            Err(e) => {
                error!("Error generating AI response: {:#}", e);
                fallback::REPLY_ON_ERROR.to_string()
            }
        }
    }

    /// Streamed reply; failures are left to the caller
    pub async fn reply_stream(
        &self,
        history: &[HistoryEntry],
        topic: &str,
        vocabulary: &[String],
    ) -> Result<FragmentStream> {
        let history = usable_history(history);
        if history.is_empty() {
            warn!("Streamed reply requested with empty history");
            let once = futures::stream::once(async {
                Ok(fallback::REPLY_ON_EMPTY_HISTORY.to_string())
            });
            return Ok(Box::pin(once));
        }
        self.generator.reply_stream(&history, topic, vocabulary).await
    }

    /// `Ok(None)` for blank input, without calling the service
    pub async fn synthesize(&self, text: &str) -> Result<Option<SynthesizedAudio>> {
        let text = text.trim();
        if text.is_empty() {
            warn!("Speech synthesis called with empty input, skipping");
            return Ok(None);
        }
        self.synthesizer.synthesize(text).await.map(Some)
    }

    pub async fn analyze(&self, conversation: &[ChatMessage], utterance: &str) -> SpeechAnalysis {
        match self.analyzer.analyze(conversation, utterance).await {
            Ok(analysis) => analysis.clamped(),
            Err(e) => {
                error!("Error analyzing speech: {:#}", e);
                SpeechAnalysis::fallback()
            }
        }
    }

    pub async fn summarize(&self, request: &SummaryRequest) -> String {
        match self.summarizer.summarize(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!("Error generating session summary: {:#}", e);
                fallback::SUMMARY_ON_ERROR.to_string()
            }
        }
    }
}

fn usable_history(history: &[HistoryEntry]) -> Vec<HistoryEntry> {
    history
        .iter()
        .filter(|h| !h.text.trim().is_empty())
        .cloned()
        .collect()
}
