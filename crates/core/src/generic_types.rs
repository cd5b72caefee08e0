use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::phase::Phase;

/// Who holds the floor for a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    User,
    Agent,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::User => write!(f, "user"),
            Party::Agent => write!(f, "agent"),
        }
    }
}

/// One utterance in the discussion, tagged with the phase it was spoken in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub party: Party,
    pub content: String,
    pub phase: Phase,
    pub spoken_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(party: Party, content: impl Into<String>, phase: Phase) -> Self {
        Self {
            party,
            content: content.into(),
            phase,
            spoken_at: Utc::now(),
        }
    }
}

/// Shape constraints applied to every rendered agent turn. Sampling
/// parameters belong to the runtime adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Hard cap on sentences per agent turn, closing question included.
    pub max_sentences: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { max_sentences: 2 }
    }
}
