use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// What a practice session is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Topic of the day (e.g., "Động vật")
    pub topic: String,

    /// Words to weave into the conversation
    pub vocabulary: Vec<String>,
}

impl SessionData {
    /// Validate and normalize: a topic and at least one word are required
    pub fn new(topic: impl Into<String>, vocabulary: Vec<String>) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        let vocabulary: Vec<String> = vocabulary
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if topic.is_empty() || vocabulary.is_empty() {
            bail!("Vui lòng nhập chủ đề và ít nhất một từ vựng.");
        }

        Ok(Self { topic, vocabulary })
    }

    /// Vocabulary given as comma-separated text, as typed in the setup form
    pub fn parse(topic: &str, vocabulary: &str) -> Result<Self> {
        Self::new(topic, vocabulary.split(',').map(str::to_string).collect())
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            topic: "Động vật".to_string(),
            vocabulary: vec![
                "con chó".to_string(),
                "con mèo".to_string(),
                "con chim".to_string(),
            ],
        }
    }
}
