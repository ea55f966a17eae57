pub mod clip;
pub mod sink;
pub mod wav;

pub use clip::{AudioClip, PcmBuffer, DEFAULT_SAMPLE_RATE};
pub use sink::{AudioSink, AudioSinkFactory, NullSink};
pub use wav::{encode_wav, ClipMetadata, WavFileSink};
