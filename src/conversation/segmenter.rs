//! Sentence segmentation for streamed text
//!
//! Fragments arrive in order from the generation stream. Complete sentences
//! are released as soon as their terminal punctuation shows up so synthesis
//! can start before the reply is finished.

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// A sentence released by the segmenter
///
/// `raw` keeps the exact span taken from the buffer, surrounding whitespace
/// included, so emitted sentences concatenate back to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    raw: String,
}

impl Sentence {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Sentence text without surrounding whitespace
    pub fn text(&self) -> &str {
        self.raw.trim()
    }

    /// Ends with `.`, `?` or `!`
    pub fn is_terminated(&self) -> bool {
        self.text().ends_with(is_terminal)
    }

    /// Has something worth sending to speech synthesis
    pub fn is_speakable(&self) -> bool {
        self.text().chars().any(char::is_alphanumeric)
    }
}

/// Buffers fragments and splits them into sentences
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every sentence it completed, in order
    pub fn push(&mut self, fragment: &str) -> Vec<Sentence> {
        self.buffer.push_str(fragment);

        let mut sentences = Vec::new();
        let mut consumed = 0;
        let mut has_content = false;
        let mut chars = self.buffer.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if is_terminal(c) && has_content {
                let mut end = i + c.len_utf8();

                // A run like "?!" or "..." closes one sentence
                while let Some(&(j, next)) = chars.peek() {
                    if !is_terminal(next) {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                while let Some(&(j, next)) = chars.peek() {
                    if !next.is_whitespace() {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }

                sentences.push(Sentence {
                    raw: self.buffer[consumed..end].to_string(),
                });
                consumed = end;
                has_content = false;
            } else if !c.is_whitespace() && !is_terminal(c) {
                has_content = true;
            }
        }

        self.buffer.drain(..consumed);
        sentences
    }

    /// Text still waiting for its terminal punctuation
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// End of stream: release whatever is left, whitespace included
    ///
    /// The remainder may not be speakable; callers check `is_speakable`.
    pub fn finish(&mut self) -> Option<Sentence> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Sentence {
            raw: std::mem::take(&mut self.buffer),
        })
    }
}
