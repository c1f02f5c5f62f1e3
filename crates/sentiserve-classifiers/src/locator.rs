//! Weight locators
//!
//! A descriptor carries its weights as an opaque string. The runtime loader
//! interprets it as one of:
//! - `builtin:<name>` for in-process classifiers
//! - `hf:<repo>[@<revision>]` for a Hugging Face Hub repository
//! - anything else as a local model directory

use std::fmt;
use std::path::PathBuf;

const BUILTIN_PREFIX: &str = "builtin:";
const HF_PREFIX: &str = "hf:";

fn default_revision() -> String {
    "main".to_string()
}

/// Parsed form of a descriptor's weight locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightLocator {
    /// Built-in implementation
    Builtin { implementation: String },

    /// Download from Hugging Face Hub
    HuggingFace { repo: String, revision: String },

    /// Load from a local model directory
    Local { path: PathBuf },
}

impl WeightLocator {
    pub fn parse(locator: &str) -> Self {
        let locator = locator.trim();

        if let Some(implementation) = locator.strip_prefix(BUILTIN_PREFIX) {
            return Self::Builtin {
                implementation: implementation.to_string(),
            };
        }

        if let Some(spec) = locator.strip_prefix(HF_PREFIX) {
            return match spec.split_once('@') {
                Some((repo, revision)) if !revision.is_empty() => Self::HuggingFace {
                    repo: repo.to_string(),
                    revision: revision.to_string(),
                },
                _ => Self::HuggingFace {
                    repo: spec.trim_end_matches('@').to_string(),
                    revision: default_revision(),
                },
            };
        }

        Self::Local {
            path: PathBuf::from(locator),
        }
    }
}

impl fmt::Display for WeightLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin { implementation } => write!(f, "{BUILTIN_PREFIX}{implementation}"),
            Self::HuggingFace { repo, revision } => write!(f, "{HF_PREFIX}{repo}@{revision}"),
            Self::Local { path } => write!(f, "{}", path.display()),
        }
    }
}
