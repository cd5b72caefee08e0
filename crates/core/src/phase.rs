//! Conversation phases of a case discussion.
//!
//! A phase decides what the agent is allowed or required to say next. Phases
//! advance in a fixed order with two loops: the opening re-prompt (`Init`
//! back to `Init`) and the exchange/checkpoint cycle.

use serde::{Deserialize, Serialize};

/// Agent turns spoken in `Exchange` before the agent must pause and ask
/// whether to continue.
pub const EXCHANGE_TURNS_PER_CHECKPOINT: u8 = 2;

/// The current phase of the discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Scenario presented; waiting for the user's position and rationale.
    #[default]
    Init,
    /// The agent is choosing its own side. Never observed between turns.
    PositionSelect,
    /// Agent position stated; waiting for the answer to the elaboration offer.
    Disclose,
    /// One case lookup is pending.
    Elaborate,
    /// The agent is challenging the user's opening position.
    Challenge,
    /// Back-and-forth debate.
    Exchange {
        /// Agent turns spoken since entering the exchange.
        agent_turns: u8,
    },
    /// Agent asked "continue or end"; waiting for the choice.
    Checkpoint,
    /// Critique delivered; waiting for the "did I change your mind" answer.
    Summary,
    /// Discussion over.
    Terminated,
}

impl Phase {
    /// Returns the agent's required behavior in this phase.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Init => {
                "Restate the question, list every option, and ask the student to pick a position with a short opening argument. Do not reveal your own position."
            }
            Self::PositionSelect => {
                "Pick a position different from the student's. Do not disclose it yet."
            }
            Self::Disclose => {
                "State which position you have chosen by giving an argument for it, then ask whether they would like you to elaborate based on the case."
            }
            Self::Elaborate => {
                "Build an expanded argument for your position from the case content provided."
            }
            Self::Challenge => "Challenge a specific aspect of the student's stated position.",
            Self::Exchange { .. } => {
                "Open by challenging the student's logic or an assumption, show you understood their argument, then challenge or build on it with a familiar analogy from outside the scenario. Do not just raise a new argument."
            }
            Self::Checkpoint => {
                "Politely pause the discussion and ask whether they want to continue or end."
            }
            Self::Summary => {
                "Summarize the strengths and weaknesses of the student's arguments, point to specific statements they could have made more effectively, restate their initial position, and ask whether you convinced them to agree with your position."
            }
            Self::Terminated => "The discussion is over.",
        }
    }

    /// Short label for logs and clients.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PositionSelect => "position_select",
            Self::Disclose => "disclose",
            Self::Elaborate => "elaborate",
            Self::Challenge => "challenge",
            Self::Exchange { .. } => "exchange",
            Self::Checkpoint => "checkpoint",
            Self::Summary => "summary",
            Self::Terminated => "terminated",
        }
    }

    /// Returns true if the session rests in this phase waiting for the user.
    pub fn awaits_user(&self) -> bool {
        matches!(
            self,
            Self::Init | Self::Disclose | Self::Exchange { .. } | Self::Checkpoint | Self::Summary
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Returns true if the exchange counter has reached the checkpoint.
    pub fn checkpoint_due(&self) -> bool {
        matches!(self, Self::Exchange { agent_turns } if *agent_turns >= EXCHANGE_TURNS_PER_CHECKPOINT)
    }

    /// Returns true if moving from this phase to `target` is allowed.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use Phase::*;
        match (self, target) {
            // Opening re-prompt when position or rationale is missing.
            (Init, Init) | (Init, PositionSelect) => true,
            (PositionSelect, Disclose) => true,
            (Disclose, Elaborate) | (Disclose, Challenge) => true,
            (Elaborate, Challenge) => true,
            (Challenge, Exchange { agent_turns: 0 }) => true,
            (Exchange { agent_turns: from }, Exchange { agent_turns: to }) => {
                *from < EXCHANGE_TURNS_PER_CHECKPOINT && *to == from + 1
            }
            (Exchange { agent_turns }, Checkpoint) => {
                *agent_turns >= EXCHANGE_TURNS_PER_CHECKPOINT
            }
            // Unclear answer: ask again.
            (Checkpoint, Checkpoint) => true,
            (Checkpoint, Exchange { agent_turns: 0 }) | (Checkpoint, Summary) => true,
            (Summary, Terminated) => true,
            _ => false,
        }
    }
}
