use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiConfig,
    pub audio: AudioConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key; falls back to GEMINI_API_KEY / API_KEY when absent
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub summary_model: String,
    pub tts_model: String,
    pub voice: String,
    pub chat_temperature: f32,
    pub summary_temperature: f32,
    pub greeting_max_tokens: u32,
    /// Upper bound for a single HTTP call (0 = no timeout)
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// "wav" writes every played clip to `output_dir`, "null" discards
    pub sink: String,
    pub output_dir: String,
    /// Hold each clip for its real duration before reporting completion
    pub realtime: bool,
}

impl AudioConfig {
    /// Copy whose output directory is a fresh `{prefix}-{timestamp}-{id}`
    /// folder under this one, so runs never share clip files
    pub fn for_run(&self, prefix: &str) -> AudioConfig {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let folder = format!(
            "{}-{}-{}",
            prefix,
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            &id[..8]
        );

        let mut audio = self.clone();
        audio.output_dir = Path::new(&self.output_dir)
            .join(folder)
            .display()
            .to_string();
        audio
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    pub streaming: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { streaming: true }
    }
}

impl Config {
    /// Load from a config file (extension optional), overlaid by
    /// `SPEECH_BUDDY__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("SPEECH_BUDDY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
