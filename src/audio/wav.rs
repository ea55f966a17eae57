use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::PathBuf;
use tracing::{info, warn};

use super::clip::PcmBuffer;
use super::sink::AudioSink;

/// Metadata for a clip written by the sink
#[derive(Debug, Clone)]
pub struct ClipMetadata {
    /// Clip number within this sink (0-indexed)
    pub clip_index: usize,
    /// File path of the written clip
    pub file_path: PathBuf,
    /// Sample rate
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Number of samples in this clip
    pub sample_count: usize,
}

/// Playback sink that writes every clip to its own WAV file
///
/// Files are named `clip-000.wav`, `clip-001.wav`, ... in playback order.
pub struct WavFileSink {
    output_dir: PathBuf,
    clip_index: usize,
    realtime: bool,
    written: Vec<ClipMetadata>,
}

impl WavFileSink {
    pub fn new(output_dir: PathBuf, realtime: bool) -> Result<Self> {
        fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        info!("WAV playback sink writing to {}", output_dir.display());

        Ok(Self {
            output_dir,
            clip_index: 0,
            realtime,
            written: Vec::new(),
        })
    }

    /// Clips written so far, in playback order
    pub fn written(&self) -> &[ClipMetadata] {
        &self.written
    }
}

#[async_trait::async_trait]
impl AudioSink for WavFileSink {
    async fn play(&mut self, pcm: &PcmBuffer) -> Result<()> {
        let path = self
            .output_dir
            .join(format!("clip-{:03}.wav", self.clip_index));

        let mut writer = ClipWriter::new(path, self.clip_index, pcm.sample_rate, pcm.channels)?;
        writer.write_samples(&pcm.samples)?;
        let metadata = writer.finish()?;

        info!(
            "Clip {} written: {:.2}s ({} samples) -> {}",
            metadata.clip_index,
            pcm.duration().as_secs_f64(),
            metadata.sample_count,
            metadata.file_path.display()
        );

        self.clip_index += 1;
        self.written.push(metadata);

        if self.realtime {
            tokio::time::sleep(pcm.duration()).await;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "wav"
    }
}

fn wav_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Encode a clip as an in-memory 16-bit WAV file
pub fn encode_wav(pcm: &PcmBuffer) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(
        Cursor::new(&mut bytes),
        wav_spec(pcm.sample_rate, pcm.channels),
    )
    .context("Failed to start WAV encoding")?;

    for &sample in &pcm.samples {
        writer
            .write_sample(sample)
            .context("Failed to encode sample")?;
    }
    writer.finalize().context("Failed to finalize WAV data")?;

    Ok(bytes)
}

/// Writes a single clip to disk as WAV file
struct ClipWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    metadata: ClipMetadata,
}

impl ClipWriter {
    fn new(file_path: PathBuf, clip_index: usize, sample_rate: u32, channels: u16) -> Result<Self> {
        let writer = hound::WavWriter::create(&file_path, wav_spec(sample_rate, channels))
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        Ok(Self {
            writer: Some(writer),
            metadata: ClipMetadata {
                clip_index,
                file_path,
                sample_rate,
                channels,
                sample_count: 0,
            },
        })
    }

    fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.metadata.sample_count += samples.len();
        }

        Ok(())
    }

    fn finish(mut self) -> Result<ClipMetadata> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        Ok(self.metadata.clone())
    }
}

impl Drop for ClipWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
