// Shared fakes for integration tests
//
// `ScriptedAi` stands in for the model provider and `RecordingSink` for the
// speaker. Synthesized clips carry the sentence's UTF-8 bytes as PCM, so the
// sink can tell which sentence it played.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use base64::Engine;
use futures::stream::{self, StreamExt};
use speech_buddy::ai::{
    AiServices, FragmentStream, HistoryEntry, SessionSummarizer, SpeechAnalysis, SpeechAnalyzer,
    SpeechSynthesizer, SummaryRequest, SynthesizedAudio, TextGenerator,
};
use speech_buddy::audio::{AudioSink, PcmBuffer};
use speech_buddy::conversation::ChatMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Base64 PCM whose samples spell out `text`
pub fn pcm_for_text(text: &str) -> String {
    let mut bytes = text.as_bytes().to_vec();
    if bytes.len() % 2 != 0 {
        bytes.push(0);
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Inverse of `pcm_for_text`
pub fn text_for_pcm(pcm: &PcmBuffer) -> String {
    let mut bytes: Vec<u8> = pcm.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// How a scripted streamed reply behaves
#[derive(Clone)]
pub enum StreamScript {
    /// Yield these fragments, then end
    Fragments(Vec<String>),
    /// Yield these fragments, then fail
    FailAfter(Vec<String>),
    /// Fail before yielding anything
    FailToOpen,
}

/// Model provider with canned answers
pub struct ScriptedAi {
    pub greeting: Option<String>,
    pub reply: Option<String>,
    pub stream: StreamScript,
    pub fragment_delay: Duration,
    pub synth_delays: HashMap<String, Duration>,
    pub synth_failures: Vec<String>,
    pub analysis: Option<SpeechAnalysis>,
    pub summary: Option<String>,
    pub summary_delay: Duration,
    pub synthesized: Mutex<Vec<String>>,
    pub histories: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl Default for ScriptedAi {
    fn default() -> Self {
        Self {
            greeting: Some("Xin chào bé!".to_string()),
            reply: Some("Giỏi lắm!".to_string()),
            stream: StreamScript::Fragments(vec!["Giỏi lắm!".to_string()]),
            fragment_delay: Duration::ZERO,
            synth_delays: HashMap::new(),
            synth_failures: Vec::new(),
            analysis: Some(SpeechAnalysis {
                accuracy: 80.0,
                engagement: "Cao".to_string(),
                psychological_note: "Bé vui vẻ".to_string(),
                is_distressed: false,
            }),
            summary: Some("Bé học rất tốt.".to_string()),
            summary_delay: Duration::ZERO,
            synthesized: Mutex::new(Vec::new()),
            histories: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedAi {
    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            stream: StreamScript::Fragments(fragments.iter().map(|f| f.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_synth_delay(mut self, text: &str, delay: Duration) -> Self {
        self.synth_delays.insert(text.to_string(), delay);
        self
    }

    pub fn services(self) -> (Arc<Self>, AiServices) {
        let ai = Arc::new(self);
        let services = AiServices::from_provider(Arc::clone(&ai));
        (ai, services)
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedAi {
    async fn greeting(&self, _topic: &str, _vocabulary: &[String]) -> Result<String> {
        self.greeting.clone().ok_or_else(|| anyhow!("greeting unavailable"))
    }

    async fn reply(
        &self,
        history: &[HistoryEntry],
        _topic: &str,
        _vocabulary: &[String],
    ) -> Result<String> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.reply.clone().ok_or_else(|| anyhow!("reply unavailable"))
    }

    async fn reply_stream(
        &self,
        history: &[HistoryEntry],
        _topic: &str,
        _vocabulary: &[String],
    ) -> Result<FragmentStream> {
        self.histories.lock().unwrap().push(history.to_vec());

        let (fragments, fail) = match &self.stream {
            StreamScript::Fragments(f) => (f.clone(), false),
            StreamScript::FailAfter(f) => (f.clone(), true),
            StreamScript::FailToOpen => bail!("stream refused"),
        };

        let delay = self.fragment_delay;
        let items = fragments
            .into_iter()
            .map(Ok)
            .chain(fail.then(|| Err(anyhow!("stream broke"))));

        Ok(Box::pin(stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            item
        })))
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ScriptedAi {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        if let Some(delay) = self.synth_delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        self.synthesized.lock().unwrap().push(text.to_string());

        if self.synth_failures.iter().any(|t| t == text) {
            bail!("No audio data received");
        }
        Ok(SynthesizedAudio {
            data: pcm_for_text(text),
            mime_type: Some("audio/L16;codec=pcm;rate=24000".to_string()),
        })
    }
}

#[async_trait::async_trait]
impl SpeechAnalyzer for ScriptedAi {
    async fn analyze(
        &self,
        _conversation: &[ChatMessage],
        _utterance: &str,
    ) -> Result<SpeechAnalysis> {
        self.analysis.clone().ok_or_else(|| anyhow!("analysis unavailable"))
    }
}

#[async_trait::async_trait]
impl SessionSummarizer for ScriptedAi {
    async fn summarize(&self, _request: &SummaryRequest) -> Result<String> {
        if !self.summary_delay.is_zero() {
            tokio::time::sleep(self.summary_delay).await;
        }
        self.summary.clone().ok_or_else(|| anyhow!("summary unavailable"))
    }
}

/// What a `RecordingSink` saw
#[derive(Clone, Default)]
pub struct SinkProbe {
    pub played: Arc<Mutex<Vec<String>>>,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
}

impl SinkProbe {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Sink that records what it plays and how many clips overlap
pub struct RecordingSink {
    probe: SinkProbe,
    play_time: Duration,
}

impl RecordingSink {
    pub fn new(play_time: Duration) -> (Box<dyn AudioSink>, SinkProbe) {
        let probe = SinkProbe::default();
        let sink = Self {
            probe: probe.clone(),
            play_time,
        };
        (Box::new(sink), probe)
    }
}

#[async_trait::async_trait]
impl AudioSink for RecordingSink {
    async fn play(&mut self, pcm: &PcmBuffer) -> Result<()> {
        let now = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.play_time).await;
        self.probe.played.lock().unwrap().push(text_for_pcm(pcm));

        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
