//! Lexicon-based sentiment classifier
//!
//! Served under the `builtin:lexicon` locator. It needs no weights, so it is
//! the usual choice for a default version that must always load.

use crate::classifier::{ClassificationMetadata, ClassificationResult, Classifier};
use aho_corasick::{AhoCorasick, MatchKind};
use sentiserve_core::Result;
use std::time::Instant;

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "loved",
    "loves",
    "amazing",
    "wonderful",
    "happy",
    "fantastic",
    "awesome",
    "best",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "hated",
    "hates",
    "horrible",
    "worst",
    "sad",
    "angry",
    "disappointed",
    "poor",
];

/// Label reported when the text carries no sentiment words
pub const NEUTRAL_LABEL: &str = "neutral";

pub struct SentimentClassifier {
    name: String,
    positive: AhoCorasick,
    negative: AhoCorasick,
}

impl SentimentClassifier {
    pub fn new() -> Result<Self> {
        Self::with_name("sentiment-lexicon")
    }

    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let positive = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(POSITIVE_WORDS)
            .map_err(|e| {
                sentiserve_core::Error::classifier(format!(
                    "Failed to build positive sentiment matcher: {e}"
                ))
            })?;

        let negative = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(NEGATIVE_WORDS)
            .map_err(|e| {
                sentiserve_core::Error::classifier(format!(
                    "Failed to build negative sentiment matcher: {e}"
                ))
            })?;

        Ok(Self {
            name: name.into(),
            positive,
            negative,
        })
    }
}

/// Count matches that stand as whole words, so "unhappy" is not "happy"
fn count_words(matcher: &AhoCorasick, text: &str) -> usize {
    matcher
        .find_iter(text)
        .filter(|m| {
            let clear_before = text[..m.start()]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let clear_after = text[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            clear_before && clear_after
        })
        .count()
}

impl Classifier for SentimentClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let positive_hits = count_words(&self.positive, text) as f32;
        let negative_hits = count_words(&self.negative, text) as f32;
        let total = positive_hits + negative_hits;

        let positive_share = if total == 0.0 {
            0.5
        } else {
            positive_hits / total
        };

        // Ties and texts without sentiment words are left to the caller's threshold.
        let (label, score) = if total == 0.0 || positive_share == 0.5 {
            (NEUTRAL_LABEL, 0.5)
        } else if positive_share > 0.5 {
            ("positive", positive_share)
        } else {
            ("negative", 1.0 - positive_share)
        };

        Ok(ClassificationResult {
            label: label.to_string(),
            score,
            metadata: ClassificationMetadata {
                model: Some(self.name.clone()),
                all_scores: Some(vec![
                    ("negative".to_string(), 1.0 - positive_share),
                    ("positive".to_string(), positive_share),
                ]),
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
