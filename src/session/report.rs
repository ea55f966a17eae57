use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conversation::ChatMessage;

/// Summary text while the evaluation is being generated
pub const SUMMARY_PLACEHOLDER: &str = "Đang tạo đánh giá và phân tích...";

/// Summary text when the evaluation task itself failed
pub const SUMMARY_FAILED: &str = "Lỗi: Không thể tạo đánh giá.";

/// Engagement label when no utterance was analysed
pub const DEFAULT_ENGAGEMENT: &str = "Trung bình";

/// Record of one finished practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: String,

    /// Local calendar date, day/month/year
    pub date: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Length in whole minutes (rounded)
    pub duration: u64,

    pub conversation: Vec<ChatMessage>,

    /// One note per analysed utterance
    pub psychological_notes: Vec<String>,

    /// Mean accuracy over analysed utterances (0 when none)
    pub accuracy: f64,

    pub engagement: String,

    pub topic: String,

    /// Placeholder until the evaluation arrives
    pub summary: String,
}

/// Elapsed minutes, rounded to the nearest integer
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u64 {
    let millis = ended_at
        .signed_duration_since(started_at)
        .num_milliseconds()
        .max(0);
    (millis as f64 / 60_000.0).round() as u64
}

/// Arithmetic mean, 0 for no scores
pub fn average_accuracy(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Most frequent engagement label; ties go to the most recent one
pub fn dominant_engagement(labels: &[String]) -> String {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, label) in labels.iter().enumerate() {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        let entry = counts.entry(label).or_insert((0, position));
        entry.0 += 1;
        entry.1 = position;
    }

    counts
        .into_iter()
        .max_by_key(|&(_, (count, last_seen))| (count, last_seen))
        .map(|(label, _)| label.to_string())
        .unwrap_or_else(|| DEFAULT_ENGAGEMENT.to_string())
}

/// Everything a speech room hands over when it ends
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub topic: String,
    pub started_at: DateTime<Utc>,
    pub conversation: Vec<ChatMessage>,
    pub psychological_notes: Vec<String>,
    pub accuracy_scores: Vec<f64>,
    pub engagement_labels: Vec<String>,
}

impl SessionReport {
    /// Build the report at `ended_at` with the placeholder summary
    pub fn from_record(record: SessionRecord, ended_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("report-{}", uuid::Uuid::new_v4()),
            date: ended_at.with_timezone(&Local).format("%-d/%-m/%Y").to_string(),
            started_at: record.started_at,
            duration: duration_minutes(record.started_at, ended_at),
            accuracy: average_accuracy(&record.accuracy_scores),
            engagement: dominant_engagement(&record.engagement_labels),
            conversation: record.conversation,
            psychological_notes: record.psychological_notes,
            topic: record.topic,
            summary: SUMMARY_PLACEHOLDER.to_string(),
        }
    }

    pub fn is_summary_pending(&self) -> bool {
        self.summary == SUMMARY_PLACEHOLDER
    }
}
