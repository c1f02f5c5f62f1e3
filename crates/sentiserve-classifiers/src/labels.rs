//! Canonicalization of classifier labels
//!
//! Models report sentiment in their own vocabularies (`POSITIVE`, `pos`,
//! `LABEL_2`, `4 stars`, ...). A fixed alias table maps the known spellings to
//! a canonical class; anything else is decided by thresholding the score.

use sentiserve_core::SentimentClass;

/// Score above which an unrecognized label counts as positive
pub const POSITIVE_THRESHOLD: f32 = 0.5;

const DEFAULT_POSITIVE: &[&str] = &["positive", "pos"];
const DEFAULT_NEGATIVE: &[&str] = &["negative", "neg"];

/// How a raw label was mapped to its class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonicalized {
    /// The label matched an alias set
    Alias(SentimentClass),
    /// The label was unknown and the score decided
    Threshold(SentimentClass),
}

impl Canonicalized {
    pub fn class(self) -> SentimentClass {
        match self {
            Self::Alias(class) | Self::Threshold(class) => class,
        }
    }
}

/// Alias table from raw labels to canonical classes
#[derive(Debug, Clone)]
pub struct LabelTable {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(DEFAULT_POSITIVE.iter().copied(), DEFAULT_NEGATIVE.iter().copied())
    }
}

impl LabelTable {
    /// Build a table from positive and negative alias sets
    pub fn new<P, N, S>(positive: P, negative: N) -> Self
    where
        P: IntoIterator<Item = S>,
        N: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            positive: positive.into_iter().map(|s| normalize(s.as_ref())).collect(),
            negative: negative.into_iter().map(|s| normalize(s.as_ref())).collect(),
        }
    }

    /// Map a raw label and its score to a canonical class
    pub fn canonicalize(&self, raw_label: &str, score: f32) -> Canonicalized {
        let label = normalize(raw_label);

        if self.positive.iter().any(|alias| *alias == label) {
            Canonicalized::Alias(SentimentClass::Positive)
        } else if self.negative.iter().any(|alias| *alias == label) {
            Canonicalized::Alias(SentimentClass::Negative)
        } else if score > POSITIVE_THRESHOLD {
            Canonicalized::Threshold(SentimentClass::Positive)
        } else {
            Canonicalized::Threshold(SentimentClass::Negative)
        }
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
