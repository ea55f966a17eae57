use super::capture::{assemble, CaptureError, CaptureEvent};
use super::config::SessionData;
use super::report::{SessionRecord, SessionReport};
use crate::ai::{AiServices, SpeechAnalysis};
use crate::audio::{encode_wav, AudioSink};
use crate::conversation::{
    ChatMessage, Orchestrator, PlaybackQueue, PlayedClip, RoomEvent, Transcript, TurnOutcome,
};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Capacity of the room event channel
const EVENT_CAPACITY: usize = 256;

/// Point-in-time view of a room for clients
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub topic: String,
    pub vocabulary: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub is_speaking: bool,
    pub is_listening: bool,
    /// Interim recognizer text while the child is talking
    pub live_transcript: String,
    pub speech_error: Option<String>,
    pub psychological_notes: Vec<String>,
    pub distress_alerts: usize,
}

/// What the room did with a capture event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// State updated, nothing else to do
    Updated,
    /// A finished utterance was handed to the conversation
    Utterance(String),
    /// A finished utterance arrived while a turn was running and was dropped
    Busy(String),
}

/// One practice session: greeting, child turns, AI turns, and the final report
pub struct SpeechRoom {
    /// Topic and vocabulary
    data: SessionData,

    /// Model-backed collaborators
    ai: AiServices,

    /// Drives AI turns and owns the playback queue handle
    orchestrator: Orchestrator,

    /// Visible chat
    transcript: Arc<Mutex<Transcript>>,

    /// When the session started
    started_at: DateTime<Utc>,

    /// An analysis or AI turn is in flight
    is_loading: Arc<AtomicBool>,

    /// The speech recognizer is capturing
    is_listening: Arc<AtomicBool>,

    live_transcript: Arc<Mutex<String>>,

    speech_error: Arc<Mutex<Option<String>>>,

    /// Per-utterance analysis results
    notes: Arc<Mutex<Vec<String>>>,
    accuracy_scores: Arc<Mutex<Vec<f64>>>,
    engagement_labels: Arc<Mutex<Vec<String>>>,

    distress_alerts: Arc<AtomicUsize>,

    events: broadcast::Sender<RoomEvent>,

    /// Handle for the playback task
    playback_task: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechRoom {
    /// Open a room that plays through `sink`
    pub fn open(
        data: SessionData,
        ai: AiServices,
        sink: Box<dyn AudioSink>,
        sample_rate: u32,
        streaming: bool,
    ) -> Arc<Self> {
        info!("Opening speech room: {} ({})", data.topic, data.vocabulary.join(", "));

        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (playback, playback_task) =
            PlaybackQueue::spawn_with_events(sink, sample_rate, events.clone());

        let orchestrator = Orchestrator::new(
            ai.clone(),
            playback,
            Arc::clone(&transcript),
            events.clone(),
            streaming,
        );

        Arc::new(Self {
            data,
            ai,
            orchestrator,
            transcript,
            started_at: Utc::now(),
            is_loading: Arc::new(AtomicBool::new(false)),
            is_listening: Arc::new(AtomicBool::new(false)),
            live_transcript: Arc::new(Mutex::new(String::new())),
            speech_error: Arc::new(Mutex::new(None)),
            notes: Arc::new(Mutex::new(Vec::new())),
            accuracy_scores: Arc::new(Mutex::new(Vec::new())),
            engagement_labels: Arc::new(Mutex::new(Vec::new())),
            distress_alerts: Arc::new(AtomicUsize::new(0)),
            events,
            playback_task: Mutex::new(Some(playback_task)),
        })
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn playback(&self) -> &PlaybackQueue {
        self.orchestrator.playback()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Greet the child and speak the greeting
    pub async fn start(&self) {
        self.is_loading.store(true, Ordering::SeqCst);

        let greeting = self
            .ai
            .greeting(&self.data.topic, &self.data.vocabulary)
            .await;
        self.append(ChatMessage::ai(greeting.clone())).await;

        if let Err(e) = self.orchestrator.speak_now(&greeting).await {
            error!("Failed to play initial greeting audio: {:#}", e);
        }

        self.is_loading.store(false, Ordering::SeqCst);
    }

    /// Typed message from the text box; refused while busy or listening
    pub async fn submit_text(&self, text: &str) -> Result<TurnOutcome> {
        let text = self.check_text(text)?;
        Ok(self.handle_utterance(&text).await)
    }

    /// Like `submit_text`, but the turn runs in the background
    pub fn accept_text(self: &Arc<Self>, text: &str) -> Result<JoinHandle<TurnOutcome>> {
        let text = self.check_text(text)?;
        Ok(self.spawn_utterance(text))
    }

    /// Validate a typed message and claim the turn for it
    fn check_text(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            bail!("Message is empty");
        }
        if self.is_listening() {
            bail!("Speech capture is active");
        }
        if !self.begin_turn() {
            bail!("Still answering the previous message");
        }
        Ok(text.to_string())
    }

    /// Mark the room busy; false if a turn is already running
    fn begin_turn(&self) -> bool {
        self.is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Record the child's utterance, analyse it, then run the AI turn.
    /// The caller has already claimed the turn.
    async fn handle_utterance(&self, text: &str) -> TurnOutcome {
        self.append(ChatMessage::user(text)).await;
        let conversation = self.transcript.lock().await.messages().to_vec();

        let analysis = self.ai.analyze(&conversation, text).await;
        self.record_analysis(text, &analysis).await;

        let history = self.transcript.lock().await.history();
        let outcome = self
            .orchestrator
            .run_turn(&history, &self.data.topic, &self.data.vocabulary)
            .await;

        self.is_loading.store(false, Ordering::SeqCst);
        outcome
    }

    /// Run `handle_utterance` in the background
    fn spawn_utterance(self: &Arc<Self>, text: String) -> JoinHandle<TurnOutcome> {
        let room = Arc::clone(self);
        tokio::spawn(async move { room.handle_utterance(&text).await })
    }

    async fn record_analysis(&self, utterance: &str, analysis: &SpeechAnalysis) {
        info!(
            "Utterance analysed: accuracy {:.0}, engagement {}, note {}",
            analysis.accuracy, analysis.engagement, analysis.psychological_note
        );

        self.notes
            .lock()
            .await
            .push(analysis.psychological_note.clone());
        self.accuracy_scores.lock().await.push(analysis.accuracy);
        self.engagement_labels
            .lock()
            .await
            .push(analysis.engagement.clone());

        if analysis.is_distressed {
            warn!("SOS: Phát hiện dấu hiệu buồn bã hoặc căng thẳng từ trẻ!");
            self.distress_alerts.fetch_add(1, Ordering::SeqCst);
            let _ = self.events.send(RoomEvent::Distress {
                utterance: utterance.to_string(),
            });
        }
    }

    /// Mic button: start or stop capture. Returns the new listening state.
    pub async fn toggle_listening(&self) -> Result<bool> {
        if self.is_loading() {
            bail!("Cannot toggle the microphone while an answer is loading");
        }
        *self.speech_error.lock().await = None;

        let listening = !self.is_listening();
        self.is_listening.store(listening, Ordering::SeqCst);
        if listening {
            self.live_transcript.lock().await.clear();
        }
        info!("Speech capture {}", if listening { "started" } else { "stopped" });
        Ok(listening)
    }

    /// Apply a recognizer event; a finished utterance starts a turn in the background
    pub async fn handle_capture(self: &Arc<Self>, event: CaptureEvent) -> CaptureOutcome {
        match event {
            CaptureEvent::Started => {
                self.is_listening.store(true, Ordering::SeqCst);
                self.live_transcript.lock().await.clear();
            }
            CaptureEvent::Result {
                result_index,
                results,
            } => {
                let update = assemble(result_index, &results);
                *self.live_transcript.lock().await = update.interim;

                if let Some(text) = update.final_text {
                    *self.speech_error.lock().await = None;
                    self.live_transcript.lock().await.clear();
                    if !self.begin_turn() {
                        warn!("Dropping utterance while a turn is running: {}", text);
                        return CaptureOutcome::Busy(text);
                    }
                    self.spawn_utterance(text.clone());
                    return CaptureOutcome::Utterance(text);
                }
            }
            CaptureEvent::Error { code } => {
                let error = CaptureError::from_code(&code);
                if error.is_unexpected() {
                    error!("Speech recognition error: {}", code);
                }
                self.is_listening.store(false, Ordering::SeqCst);

                if let Some(hint) = error.hint() {
                    *self.speech_error.lock().await = Some(hint.to_string());
                    let _ = self.events.send(RoomEvent::CaptureHint {
                        message: hint.to_string(),
                    });
                }
            }
            CaptureEvent::Ended => {
                self.is_listening.store(false, Ordering::SeqCst);
            }
        }
        CaptureOutcome::Updated
    }

    /// Clips spoken so far, audio omitted
    pub async fn clips(&self) -> Vec<PlayedClip> {
        self.playback().played_clips().await
    }

    /// One spoken clip as a WAV file; `None` if it has not played
    pub async fn clip_wav(&self, seq: u64) -> Option<Result<Vec<u8>>> {
        let clip = self.playback().played_clip(seq).await?;
        Some(encode_wav(&clip.pcm))
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            topic: self.data.topic.clone(),
            vocabulary: self.data.vocabulary.clone(),
            started_at: self.started_at,
            messages: self.transcript.lock().await.messages().to_vec(),
            is_loading: self.is_loading(),
            is_speaking: self.playback().is_speaking(),
            is_listening: self.is_listening(),
            live_transcript: self.live_transcript.lock().await.clone(),
            speech_error: self.speech_error.lock().await.clone(),
            psychological_notes: self.notes.lock().await.clone(),
            distress_alerts: self.distress_alerts.load(Ordering::SeqCst),
        }
    }

    /// Close the session and build its report (summary still pending)
    pub async fn end(&self) -> SessionReport {
        self.end_at(Utc::now()).await
    }

    /// Same as `end`, with an explicit end time
    pub async fn end_at(&self, ended_at: DateTime<Utc>) -> SessionReport {
        self.is_listening.store(false, Ordering::SeqCst);

        let record = SessionRecord {
            topic: self.data.topic.clone(),
            started_at: self.started_at,
            conversation: self.transcript.lock().await.messages().to_vec(),
            psychological_notes: self.notes.lock().await.clone(),
            accuracy_scores: self.accuracy_scores.lock().await.clone(),
            engagement_labels: self.engagement_labels.lock().await.clone(),
        };
        let report = SessionReport::from_record(record, ended_at);

        info!(
            "Speech room closed: {} min, accuracy {:.0}, {} messages",
            report.duration,
            report.accuracy,
            report.conversation.len()
        );

        report
    }

    /// Let queued audio finish, then stop the playback task
    pub async fn drain_playback(&self) {
        self.playback().wait_idle().await;
        if let Some(task) = self.playback_task.lock().await.take() {
            task.abort();
        }
    }

    async fn append(&self, message: ChatMessage) -> usize {
        let index = self.transcript.lock().await.push(message.clone());
        let _ = self.events.send(RoomEvent::MessageAppended { index, message });
        index
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
