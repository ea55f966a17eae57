use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::debug;

use super::clip::PcmBuffer;
use super::wav::WavFileSink;
use crate::config::AudioConfig;

/// Audio output trait
///
/// `play` resolves once the clip has finished playing; the playback queue
/// treats that as the completion event before starting the next clip.
///
/// Implementations:
/// - `WavFileSink`: writes each clip to disk (kiosk logging, tests)
/// - `NullSink`: discards audio, optionally holding for the clip duration
#[async_trait::async_trait]
pub trait AudioSink: Send {
    /// Play one clip to completion
    async fn play(&mut self, pcm: &PcmBuffer) -> Result<()>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}

/// Sink that produces no sound
#[derive(Debug, Default)]
pub struct NullSink {
    realtime: bool,
}

impl NullSink {
    pub fn new(realtime: bool) -> Self {
        Self { realtime }
    }
}

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn play(&mut self, pcm: &PcmBuffer) -> Result<()> {
        let duration = pcm.duration();
        debug!("Null sink swallowing {:.2}s of audio", duration.as_secs_f64());
        if self.realtime {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Audio sink factory
pub struct AudioSinkFactory;

impl AudioSinkFactory {
    /// Create the sink named in the audio configuration
    pub fn create(config: &AudioConfig) -> Result<Box<dyn AudioSink>> {
        match config.sink.as_str() {
            "wav" => {
                let sink = WavFileSink::new(PathBuf::from(&config.output_dir), config.realtime)?;
                Ok(Box::new(sink))
            }
            "null" => Ok(Box::new(NullSink::new(config.realtime))),
            other => bail!("Unknown audio sink '{}' (expected \"wav\" or \"null\")", other),
        }
    }
}
