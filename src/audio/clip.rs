use anyhow::{bail, Context, Result};
use base64::Engine;
use std::time::Duration;

/// Default TTS output format: 24kHz mono, 16-bit little-endian PCM
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Decoded audio ready for a sink (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl PcmBuffer {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// One synthesized sentence, still encoded as it came off the wire
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Playback ticket this clip belongs to
    pub seq: u64,
    /// Sentence the clip speaks
    pub text: String,
    /// Base64-encoded PCM bytes
    pub data: String,
    /// MIME type reported by the TTS service, e.g. `audio/L16;codec=pcm;rate=24000`
    pub mime_type: Option<String>,
}

impl AudioClip {
    pub fn new(seq: u64, text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            seq,
            text: text.into(),
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sample rate announced in the MIME type (`rate=NNNN`), if any
    pub fn announced_rate(&self) -> Option<u32> {
        self.mime_type
            .as_deref()?
            .split(';')
            .filter_map(|part| part.trim().strip_prefix("rate="))
            .find_map(|rate| rate.parse().ok())
    }

    /// Decode the base64 payload into mono PCM samples
    pub fn decode(&self, default_rate: u32) -> Result<PcmBuffer> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .with_context(|| format!("Clip {} is not valid base64", self.seq))?;

        if bytes.is_empty() {
            bail!("Clip {} carries no audio", self.seq);
        }
        if bytes.len() % 2 != 0 {
            bail!(
                "Clip {} has an odd byte count ({}) for 16-bit PCM",
                self.seq,
                bytes.len()
            );
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(PcmBuffer {
            samples,
            sample_rate: self.announced_rate().unwrap_or(default_rate),
            channels: 1,
        })
    }
}
