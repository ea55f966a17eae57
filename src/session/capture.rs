use serde::{Deserialize, Serialize};

/// Shown when the recognizer heard nothing
pub const NO_SPEECH_HINT: &str = "Mình không nghe thấy bạn nói. Thử lại nhé?";

/// Shown for any other recognizer failure
pub const CAPTURE_FAILED_HINT: &str = "Có lỗi xảy ra khi thu âm. Vui lòng thử lại.";

/// Event from the speech recognizer (browser, mobile app, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    Started,
    /// Result list from the recognizer; entries before `result_index` were already delivered
    Result {
        #[serde(default)]
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error {
        code: String,
    },
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

/// Live text plus the finished utterance, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionUpdate {
    pub interim: String,
    pub final_text: Option<String>,
}

/// Split new results into interim text and a finished utterance
pub fn assemble(result_index: usize, results: &[RecognitionResult]) -> RecognitionUpdate {
    let mut interim = String::new();
    let mut finished = String::new();

    for result in results.iter().skip(result_index) {
        if result.is_final {
            finished.push_str(&result.transcript);
        } else {
            interim.push_str(&result.transcript);
        }
    }

    let finished = finished.trim();
    RecognitionUpdate {
        interim,
        final_text: (!finished.is_empty()).then(|| finished.to_string()),
    }
}

/// Recognizer error codes, grouped by how they are surfaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Nothing was heard; recoverable
    NoSpeech,
    /// Capture was stopped on purpose
    Aborted,
    Other(String),
}

impl CaptureError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Message for the child, `None` when the error should stay silent
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoSpeech => Some(NO_SPEECH_HINT),
            Self::Aborted => None,
            Self::Other(_) => Some(CAPTURE_FAILED_HINT),
        }
    }

    /// Worth an error log (expected codes are not)
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}
