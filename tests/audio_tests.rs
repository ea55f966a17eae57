// Tests for clip decoding and the playback sinks

use anyhow::Result;
use base64::Engine;
use speech_buddy::audio::{
    AudioClip, AudioSink, AudioSinkFactory, NullSink, PcmBuffer, WavFileSink, DEFAULT_SAMPLE_RATE,
};
use speech_buddy::config::AudioConfig;
use std::time::Duration;
use tempfile::TempDir;

fn encode(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn audio_config(sink: &str, output_dir: &str) -> AudioConfig {
    AudioConfig {
        sample_rate: DEFAULT_SAMPLE_RATE,
        sink: sink.to_string(),
        output_dir: output_dir.to_string(),
        realtime: false,
    }
}

#[test]
fn test_clip_decodes_little_endian_pcm() -> Result<()> {
    let clip = AudioClip::new(0, "Chào.", encode(&[0, 1, -1, i16::MAX, i16::MIN]));
    let pcm = clip.decode(DEFAULT_SAMPLE_RATE)?;

    assert_eq!(pcm.samples, vec![0, 1, -1, i16::MAX, i16::MIN]);
    assert_eq!(pcm.sample_rate, 24_000);
    assert_eq!(pcm.channels, 1);
    Ok(())
}

#[test]
fn test_clip_rate_comes_from_mime_type() -> Result<()> {
    let clip = AudioClip::new(3, "Chào.", encode(&[0; 8]))
        .with_mime_type("audio/L16;codec=pcm;rate=16000");

    assert_eq!(clip.announced_rate(), Some(16_000));
    assert_eq!(clip.decode(DEFAULT_SAMPLE_RATE)?.sample_rate, 16_000);

    let plain = AudioClip::new(4, "Chào.", encode(&[0; 8])).with_mime_type("audio/L16");
    assert_eq!(plain.announced_rate(), None);
    Ok(())
}

#[test]
fn test_clip_rejects_bad_payloads() {
    assert!(AudioClip::new(0, "x", "not base64!").decode(24_000).is_err());
    assert!(AudioClip::new(0, "x", "").decode(24_000).is_err());
    assert!(AudioClip::new(0, "x", "AAAA").decode(24_000).is_err());
}

#[test]
fn test_pcm_duration() {
    let pcm = PcmBuffer {
        samples: vec![0; 12_000],
        sample_rate: 24_000,
        channels: 1,
    };
    assert_eq!(pcm.duration(), Duration::from_millis(500));

    let stereo = PcmBuffer {
        channels: 2,
        ..pcm.clone()
    };
    assert_eq!(stereo.duration(), Duration::from_millis(250));
}

#[tokio::test]
async fn test_wav_sink_writes_one_file_per_clip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut sink = WavFileSink::new(temp_dir.path().join("room"), false)?;

    for n in 0..2 {
        let pcm = PcmBuffer {
            samples: vec![n as i16; 2_400],
            sample_rate: 24_000,
            channels: 1,
        };
        sink.play(&pcm).await?;
    }

    assert_eq!(sink.written().len(), 2);
    let second = &sink.written()[1];
    assert_eq!(second.clip_index, 1);
    assert!(second
        .file_path
        .to_string_lossy()
        .ends_with("clip-001.wav"));

    let reader = hound::WavReader::open(&second.file_path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(samples.len(), 2_400);
    assert!(samples.iter().all(|&s| s == 1));

    Ok(())
}

#[tokio::test]
async fn test_null_sink_completes() -> Result<()> {
    let mut sink = NullSink::new(false);
    let pcm = PcmBuffer {
        samples: vec![0; 480],
        sample_rate: 24_000,
        channels: 1,
    };
    sink.play(&pcm).await?;
    assert_eq!(sink.name(), "null");
    Ok(())
}

#[test]
fn test_sink_factory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path().join("clips");
    let dir = dir.to_string_lossy();

    assert_eq!(AudioSinkFactory::create(&audio_config("wav", &dir))?.name(), "wav");
    assert_eq!(AudioSinkFactory::create(&audio_config("null", &dir))?.name(), "null");
    assert!(AudioSinkFactory::create(&audio_config("speaker", &dir)).is_err());
    Ok(())
}

#[test]
fn test_each_run_gets_its_own_folder() {
    let base = audio_config("wav", "recordings/playback");

    let first = base.for_run("session");
    let second = base.for_run("session");

    assert_ne!(first.output_dir, second.output_dir);
    assert!(first.output_dir.starts_with("recordings/playback"));
    let folder = std::path::Path::new(&first.output_dir)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap();
    assert!(folder.starts_with("session-"));
    assert_eq!(base.output_dir, "recordings/playback");
}
