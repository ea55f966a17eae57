//! Serialized playback of synthesized clips
//!
//! Synthesis requests run concurrently and may finish in any order, so every
//! request first takes a [`PlaybackTicket`]. The playback task admits clips in
//! ticket order through a small reorder buffer and plays them one at a time.
//! A ticket dropped without audio (failed or empty synthesis) is released so
//! the clips behind it are not held up.
//!
//! Every clip that starts playing is kept for the lifetime of the queue and
//! announced as [`RoomEvent::ClipReady`], so remote clients can fetch and play
//! the same audio.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::transcript::RoomEvent;
use crate::audio::{AudioClip, AudioSink, PcmBuffer};

/// Observable queue state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    /// A clip is playing or ready to play
    pub speaking: bool,
    /// Tickets settled so far (played, dropped or skipped)
    pub admitted: u64,
    /// Clips that reached the sink and completed
    pub played: u64,
}

/// A decoded clip handed to the sink
#[derive(Debug, Clone, Serialize)]
pub struct PlayedClip {
    pub seq: u64,
    pub text: String,
    pub duration_ms: u64,
    #[serde(skip)]
    pub pcm: PcmBuffer,
}

type ClipArchive = Arc<Mutex<BTreeMap<u64, PlayedClip>>>;

enum Command {
    Admit { seq: u64, clip: Option<AudioClip> },
}

/// Handle to the playback task
///
/// Cheap to clone; the task stops once every handle and ticket is gone.
#[derive(Clone)]
pub struct PlaybackQueue {
    tx: mpsc::UnboundedSender<Command>,
    next_ticket: Arc<AtomicU64>,
    status: watch::Receiver<PlaybackStatus>,
    archive: ClipArchive,
}

impl PlaybackQueue {
    /// Spawn the playback task on the current runtime
    pub fn spawn(sink: Box<dyn AudioSink>, default_sample_rate: u32) -> (Self, JoinHandle<()>) {
        let (events, _) = broadcast::channel(16);
        Self::spawn_with_events(sink, default_sample_rate, events)
    }

    /// Like `spawn`, announcing each clip on `events` as it starts playing
    pub fn spawn_with_events(
        sink: Box<dyn AudioSink>,
        default_sample_rate: u32,
        events: broadcast::Sender<RoomEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let archive = ClipArchive::default();

        let player = Player {
            sink,
            status_tx,
            archive: Arc::clone(&archive),
            events,
            default_sample_rate,
        };
        let task = tokio::spawn(player.run(rx));

        let queue = Self {
            tx,
            next_ticket: Arc::new(AtomicU64::new(0)),
            status: status_rx,
            archive,
        };
        (queue, task)
    }

    /// Reserve the next playback slot
    pub fn reserve(&self) -> PlaybackTicket {
        let seq = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        PlaybackTicket {
            seq,
            tx: self.tx.clone(),
            settled: false,
        }
    }

    /// Reserve a slot and fill it at once
    pub fn enqueue(&self, text: impl Into<String>, data: impl Into<String>) -> Result<u64> {
        let ticket = self.reserve();
        let seq = ticket.seq();
        ticket.fulfill(AudioClip::new(seq, text, data))?;
        Ok(seq)
    }

    pub fn is_speaking(&self) -> bool {
        self.status.borrow().speaking
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    /// Clips that have started playing, in playback order
    pub async fn played_clips(&self) -> Vec<PlayedClip> {
        self.archive.lock().await.values().cloned().collect()
    }

    pub async fn played_clip(&self, seq: u64) -> Option<PlayedClip> {
        self.archive.lock().await.get(&seq).cloned()
    }

    /// Wait until every ticket reserved so far has been settled and nothing is playing
    pub async fn wait_idle(&self) {
        let reserved = self.next_ticket.load(Ordering::SeqCst);
        let mut status = self.status.clone();
        // Err means the task is gone, which is idle enough
        let _ = status
            .wait_for(|s| !s.speaking && s.admitted >= reserved)
            .await;
    }
}

/// A reserved playback slot
///
/// Dropping an unfulfilled ticket tells the queue to skip its slot.
pub struct PlaybackTicket {
    seq: u64,
    tx: mpsc::UnboundedSender<Command>,
    settled: bool,
}

impl PlaybackTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Hand the synthesized clip to the queue
    pub fn fulfill(mut self, mut clip: AudioClip) -> Result<()> {
        clip.seq = self.seq;
        self.settled = true;
        self.tx
            .send(Command::Admit {
                seq: self.seq,
                clip: Some(clip),
            })
            .map_err(|_| anyhow::anyhow!("Playback task has stopped"))
    }

    /// Give the slot up explicitly
    pub fn skip(self) {
        // Drop does the work
    }
}

impl Drop for PlaybackTicket {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Skipping playback slot {}", self.seq);
            let _ = self.tx.send(Command::Admit {
                seq: self.seq,
                clip: None,
            });
        }
    }
}

/// Reorder buffer: releases clips strictly in ticket order
#[derive(Debug, Default)]
struct ReorderBuffer {
    next_seq: u64,
    pending: BTreeMap<u64, Option<AudioClip>>,
}

impl ReorderBuffer {
    fn admit(&mut self, seq: u64, clip: Option<AudioClip>, ready: &mut VecDeque<AudioClip>) {
        if seq < self.next_seq || self.pending.contains_key(&seq) {
            warn!("Ignoring duplicate playback slot {}", seq);
            return;
        }
        self.pending.insert(seq, clip);

        while let Some(entry) = self.pending.remove(&self.next_seq) {
            self.next_seq += 1;
            if let Some(clip) = entry {
                ready.push_back(clip);
            }
        }
    }
}

/// State owned by the playback task
struct Player {
    sink: Box<dyn AudioSink>,
    status_tx: watch::Sender<PlaybackStatus>,
    archive: ClipArchive,
    events: broadcast::Sender<RoomEvent>,
    default_sample_rate: u32,
}

impl Player {
    fn publish(&self, speaking: bool, admitted: u64, played: u64) {
        self.status_tx.send_if_modified(|status| {
            let next = PlaybackStatus {
                speaking,
                admitted,
                played,
            };
            let changed = *status != next;
            *status = next;
            changed
        });
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!("Playback task started (sink: {})", self.sink.name());

        let mut reorder = ReorderBuffer::default();
        let mut ready: VecDeque<AudioClip> = VecDeque::new();
        let mut played = 0u64;

        loop {
            if ready.is_empty() {
                self.publish(false, reorder.next_seq, played);

                match rx.recv().await {
                    Some(Command::Admit { seq, clip }) => reorder.admit(seq, clip, &mut ready),
                    None => break,
                }
            }

            while let Ok(Command::Admit { seq, clip }) = rx.try_recv() {
                reorder.admit(seq, clip, &mut ready);
            }

            let Some(clip) = ready.pop_front() else {
                continue;
            };
            self.publish(true, reorder.next_seq, played);

            match clip.decode(self.default_sample_rate) {
                Ok(pcm) => {
                    debug!(
                        "Playing clip {} ({:.2}s): {}",
                        clip.seq,
                        pcm.duration().as_secs_f64(),
                        clip.text
                    );
                    self.announce(&clip, &pcm).await;
                    match self.sink.play(&pcm).await {
                        Ok(()) => played += 1,
                        Err(e) => warn!("Dropping clip {}: playback failed: {:#}", clip.seq, e),
                    }
                }
                Err(e) => warn!("Dropping clip {}: {:#}", clip.seq, e),
            }
        }

        self.publish(false, reorder.next_seq, played);
        info!("Playback task stopped ({} clips played)", played);
    }

    // &mut keeps the task future Send; the sink is not Sync
    async fn announce(&mut self, clip: &AudioClip, pcm: &PcmBuffer) {
        let played = PlayedClip {
            seq: clip.seq,
            text: clip.text.clone(),
            duration_ms: pcm.duration().as_millis() as u64,
            pcm: pcm.clone(),
        };
        let event = RoomEvent::ClipReady {
            seq: played.seq,
            text: played.text.clone(),
            duration_ms: played.duration_ms,
        };

        self.archive.lock().await.insert(clip.seq, played);
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_buffer_holds_gap() {
        let mut reorder = ReorderBuffer::default();
        let mut ready = VecDeque::new();

        reorder.admit(1, Some(AudioClip::new(1, "b", "")), &mut ready);
        assert!(ready.is_empty());

        reorder.admit(0, Some(AudioClip::new(0, "a", "")), &mut ready);
        let order: Vec<u64> = ready.iter().map(|c| c.seq).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_reorder_buffer_skipped_slot_releases_followers() {
        let mut reorder = ReorderBuffer::default();
        let mut ready = VecDeque::new();

        reorder.admit(2, Some(AudioClip::new(2, "c", "")), &mut ready);
        reorder.admit(0, Some(AudioClip::new(0, "a", "")), &mut ready);
        assert_eq!(ready.len(), 1);

        reorder.admit(1, None, &mut ready);
        let order: Vec<u64> = ready.iter().map(|c| c.seq).collect();
        assert_eq!(order, vec![0, 2]);
        assert_eq!(reorder.next_seq, 3);
    }

    #[test]
    fn test_reorder_buffer_ignores_duplicates() {
        let mut reorder = ReorderBuffer::default();
        let mut ready = VecDeque::new();

        reorder.admit(0, Some(AudioClip::new(0, "a", "")), &mut ready);
        reorder.admit(0, Some(AudioClip::new(0, "again", "")), &mut ready);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].text, "a");
    }
}
