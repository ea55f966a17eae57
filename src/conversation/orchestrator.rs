use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

use super::playback::{PlaybackQueue, PlaybackTicket};
use super::segmenter::{Sentence, SentenceSegmenter};
use super::transcript::{ChatMessage, RoomEvent, Transcript};
use crate::ai::{fallback, AiServices, HistoryEntry, SynthesizedAudio};
use crate::audio::AudioClip;

/// What one AI turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Transcript index of the AI message
    pub index: usize,
    /// Final text of the AI message
    pub text: String,
    /// Sentences sent to speech synthesis
    pub sentences: usize,
    /// False when the stream failed and the message was replaced by an apology
    pub completed: bool,
}

/// Drives one AI reply from generation to the speaker
///
/// Fragments go to the transcript as they arrive and through the segmenter;
/// each finished sentence takes a playback ticket before its synthesis call is
/// spawned, so audio plays in sentence order whatever order synthesis finishes in.
pub struct Orchestrator {
    ai: AiServices,
    playback: PlaybackQueue,
    transcript: Arc<Mutex<Transcript>>,
    events: broadcast::Sender<RoomEvent>,
    streaming: bool,
}

impl Orchestrator {
    pub fn new(
        ai: AiServices,
        playback: PlaybackQueue,
        transcript: Arc<Mutex<Transcript>>,
        events: broadcast::Sender<RoomEvent>,
        streaming: bool,
    ) -> Self {
        Self {
            ai,
            playback,
            transcript,
            events,
            streaming,
        }
    }

    pub fn playback(&self) -> &PlaybackQueue {
        &self.playback
    }

    /// Run one AI turn against `history`
    pub async fn run_turn(&self, history: &[HistoryEntry], topic: &str, vocabulary: &[String]) -> TurnOutcome {
        let index = self.append(ChatMessage::ai(String::new())).await;

        if self.streaming {
            self.stream_turn(index, history, topic, vocabulary).await
        } else {
            self.whole_turn(index, history, topic, vocabulary).await
        }
    }

    async fn stream_turn(
        &self,
        index: usize,
        history: &[HistoryEntry],
        topic: &str,
        vocabulary: &[String],
    ) -> TurnOutcome {
        let mut segmenter = SentenceSegmenter::new();
        let mut text = String::new();
        let mut sentences = 0;

        let mut stream = match self.ai.reply_stream(history, topic, vocabulary).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Error opening AI response stream: {:#}", e);
                return self.apologize(index, sentences).await;
            }
        };

        while let Some(fragment) = stream.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    error!("Error in AI response stream: {:#}", e);
                    return self.apologize(index, sentences).await;
                }
            };

            text.push_str(&fragment);
            self.extend(index, &fragment).await;

            for sentence in segmenter.push(&fragment) {
                if self.speak(sentence) {
                    sentences += 1;
                }
            }
        }

        if let Some(rest) = segmenter.finish() {
            if self.speak(rest) {
                sentences += 1;
            }
        }

        info!("AI turn finished: {} chars, {} sentences", text.len(), sentences);
        TurnOutcome {
            index,
            text,
            sentences,
            completed: true,
        }
    }

    async fn whole_turn(
        &self,
        index: usize,
        history: &[HistoryEntry],
        topic: &str,
        vocabulary: &[String],
    ) -> TurnOutcome {
        let text = self.ai.reply(history, topic, vocabulary).await;
        self.extend(index, &text).await;

        let mut segmenter = SentenceSegmenter::new();
        let mut sentences = 0;
        for sentence in segmenter.push(&text).into_iter().chain(segmenter.finish()) {
            if self.speak(sentence) {
                sentences += 1;
            }
        }

        TurnOutcome {
            index,
            text,
            sentences,
            completed: true,
        }
    }

    /// Start synthesis for a sentence in the background; false if nothing to say
    pub fn speak(&self, sentence: Sentence) -> bool {
        if !sentence.is_speakable() {
            debug!("Nothing to speak in {:?}", sentence.raw());
            return false;
        }

        let ticket = self.playback.reserve();
        let ai = self.ai.clone();
        let text = sentence.text().to_string();

        tokio::spawn(async move {
            match ai.synthesize(&text).await {
                Ok(Some(audio)) => admit(ticket, &text, audio),
                Ok(None) => ticket.skip(),
                // The slot is released when the ticket drops
                Err(e) => error!("Error generating speech for slot {}: {:#}", ticket.seq(), e),
            }
        });

        true
    }

    /// Synthesize `text` as one clip and wait until it is queued
    pub async fn speak_now(&self, text: &str) -> Result<()> {
        let ticket = self.playback.reserve();
        match self.ai.synthesize(text).await? {
            Some(audio) => admit(ticket, text, audio),
            None => ticket.skip(),
        }
        Ok(())
    }

    async fn append(&self, message: ChatMessage) -> usize {
        let index = self.transcript.lock().await.push(message.clone());
        let _ = self.events.send(RoomEvent::MessageAppended { index, message });
        index
    }

    async fn extend(&self, index: usize, fragment: &str) {
        let text = {
            let mut transcript = self.transcript.lock().await;
            transcript.append(index, fragment).map(str::to_string)
        };
        if let Some(text) = text {
            let _ = self.events.send(RoomEvent::MessageUpdated { index, text });
        }
    }

    async fn apologize(&self, index: usize, sentences: usize) -> TurnOutcome {
        let text = fallback::STREAM_APOLOGY.to_string();
        self.transcript.lock().await.replace(index, text.clone());
        let _ = self.events.send(RoomEvent::MessageUpdated {
            index,
            text: text.clone(),
        });

        TurnOutcome {
            index,
            text,
            sentences,
            completed: false,
        }
    }
}

fn admit(ticket: PlaybackTicket, text: &str, audio: SynthesizedAudio) {
    let seq = ticket.seq();
    let mut clip = AudioClip::new(seq, text, audio.data);
    if let Some(mime_type) = audio.mime_type {
        clip = clip.with_mime_type(mime_type);
    }
    if let Err(e) = ticket.fulfill(clip) {
        error!("Could not queue clip {}: {:#}", seq, e);
    }
}
