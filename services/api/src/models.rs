//! API Models
//!
//! This module defines the data structures returned by the REST API and used
//! for generating OpenAPI documentation with `utoipa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use study_partner_core::{
    generic_types::{Party, Turn},
    scenario::Scenario,
};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    Active,
    Ended,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
pub enum MessageRole {
    User,
    Ai,
}

// Implement Display for easy conversion to a string, useful for logging and debugging.
impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Ai => write!(f, "ai"),
        }
    }
}

impl From<Party> for MessageRole {
    fn from(party: Party) -> Self {
        match party {
            Party::User => MessageRole::User,
            Party::Agent => MessageRole::Ai,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct Session {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub user_id: String,
    #[schema(example = "Rivian")]
    pub subject: String,
    #[schema(example = "exchange")]
    pub phase: String,
    #[schema(value_type = String, example = "active")]
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct Message {
    /// Position of the message in the transcript.
    pub index: usize,
    #[schema(value_type = String, example = "user")]
    pub role: MessageRole,
    pub content: String,
    #[schema(example = "disclose")]
    pub phase: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn from_turn(index: usize, turn: &Turn) -> Self {
        Self {
            index,
            role: turn.party.into(),
            content: turn.content.clone(),
            phase: turn.phase.label().to_string(),
            created_at: turn.spoken_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub user_position: Option<String>,
    pub agent_position: Option<String>,
    pub checkpoints: u32,
    pub messages: Vec<Message>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ScenarioResponse {
    #[schema(example = "Rivian")]
    pub subject: String,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Scenario> for ScenarioResponse {
    fn from(scenario: &Scenario) -> Self {
        Self {
            subject: scenario.subject.clone(),
            question: scenario.question.clone(),
            options: scenario.options.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
