use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures::StreamExt;
use tracing::{debug, info};

use super::messages::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, SpeechConfig,
};
use super::sse::SseDecoder;
use super::{
    prompts, FragmentStream, HistoryEntry, SessionSummarizer, SpeechAnalysis, SpeechAnalyzer,
    SpeechSynthesizer, SummaryRequest, SynthesizedAudio, TextGenerator,
};
use crate::config::GeminiConfig;
use crate::conversation::ChatMessage;

/// Client for the Gemini `generateContent` REST API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    summary_model: String,
    tts_model: String,
    voice: String,
    chat_temperature: f32,
    summary_temperature: f32,
    greeting_max_tokens: u32,
}

impl GeminiClient {
    /// Build from config; the key may also come from GEMINI_API_KEY or API_KEY
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .context("Gemini API key not set (gemini.api_key, GEMINI_API_KEY or API_KEY)")?;

        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        info!(
            "Gemini client ready (chat: {}, summary: {}, tts: {})",
            config.chat_model, config.summary_model, config.tts_model
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            summary_model: config.summary_model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
            chat_temperature: config.chat_temperature,
            summary_temperature: config.summary_temperature,
            greeting_max_tokens: config.greeting_max_tokens,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: String, request: &GenerateContentRequest) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body);
        }

        Ok(response)
    }

    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        debug!("generateContent on {}", model);
        let response = self
            .post(self.endpoint(model, "generateContent"), request)
            .await?
            .json::<GenerateContentResponse>()
            .await
            .context("Malformed generateContent response")?;

        if let Some(err) = response.error {
            bail!("Gemini error {}: {}", err.code, err.message);
        }
        Ok(response)
    }

    async fn generate_stream(&self, model: &str, request: &GenerateContentRequest) -> Result<FragmentStream> {
        debug!("streamGenerateContent on {}", model);
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        let response = self.post(url, request).await?;

        let mut bytes = Box::pin(response.bytes_stream());
        let stream = async_stream::try_stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.context("Gemini stream interrupted")?;
                for payload in decoder.push(&chunk) {
                    if let Some(text) = parse_stream_event(&payload)? {
                        yield text;
                    }
                }
            }
            if let Some(payload) = decoder.finish() {
                if let Some(text) = parse_stream_event(&payload)? {
                    yield text;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn chat_request(&self, history: &[HistoryEntry], topic: &str, vocabulary: &[String]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: history.iter().map(Content::from).collect(),
            system_instruction: Some(Content::instruction(prompts::chat_instruction(
                topic, vocabulary,
            ))),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.chat_temperature),
                ..Default::default()
            }),
        }
    }
}

/// One SSE payload to its text, if it carries any
fn parse_stream_event(payload: &str) -> Result<Option<String>> {
    let event: GenerateContentResponse =
        serde_json::from_str(payload).context("Malformed stream event")?;
    if let Some(err) = event.error {
        return Err(anyhow!("Gemini stream error {}: {}", err.code, err.message));
    }
    let text = event.text();
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn greeting(&self, topic: &str, vocabulary: &[String]) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::greeting(topic, vocabulary))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(self.chat_temperature),
                max_output_tokens: Some(self.greeting_max_tokens),
                ..Default::default()
            }),
        };
        Ok(self.generate(&self.chat_model, &request).await?.text())
    }

    async fn reply(&self, history: &[HistoryEntry], topic: &str, vocabulary: &[String]) -> Result<String> {
        let request = self.chat_request(history, topic, vocabulary);
        Ok(self.generate(&self.chat_model, &request).await?.text())
    }

    async fn reply_stream(
        &self,
        history: &[HistoryEntry],
        topic: &str,
        vocabulary: &[String],
    ) -> Result<FragmentStream> {
        let request = self.chat_request(history, topic, vocabulary);
        self.generate_stream(&self.chat_model, &request).await
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(None, text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(&self.voice)),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.tts_model, &request).await?;
        let inline = response
            .inline_data()
            .filter(|d| !d.data.is_empty())
            .context("No audio data received")?;

        Ok(SynthesizedAudio {
            data: inline.data.clone(),
            mime_type: Some(inline.mime_type.clone()).filter(|m| !m.is_empty()),
        })
    }
}

#[async_trait::async_trait]
impl SpeechAnalyzer for GeminiClient {
    async fn analyze(&self, conversation: &[ChatMessage], utterance: &str) -> Result<SpeechAnalysis> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::analysis(conversation, utterance))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(prompts::analysis_schema()),
                ..Default::default()
            }),
        };

        let text = self.generate(&self.chat_model, &request).await?.text();
        serde_json::from_str(text.trim()).context("Analysis response is not the expected JSON")
    }
}

#[async_trait::async_trait]
impl SessionSummarizer for GeminiClient {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let prompt = prompts::summary(&request.topic, &request.conversation, &request.notes);
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(self.summary_temperature),
                ..Default::default()
            }),
        };

        let text = self.generate(&self.summary_model, &request).await?.text();
        if text.trim().is_empty() {
            bail!("Summary response was empty");
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_event_text() {
        let payload = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Chào "},{"text":"con!"}]}}]}"#;
        assert_eq!(parse_stream_event(payload).unwrap().as_deref(), Some("Chào con!"));
    }

    #[test]
    fn test_parse_stream_event_without_text() {
        let payload = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(parse_stream_event(payload).unwrap(), None);
    }

    #[test]
    fn test_parse_stream_event_error() {
        let payload = r#"{"error":{"code":429,"message":"quota"}}"#;
        assert!(parse_stream_event(payload).is_err());
    }
}
