//! Study Session
//!
//! `StudySession` is the dialogue phase controller. It owns the scenario, both
//! positions, the transcript and the current [`Phase`], and it is threaded
//! explicitly through every turn: the user's reply goes in through
//! [`StudySession::accept_user_turn`], a [`Directive`] for the next agent
//! utterance comes out, and the rendered utterance is handed back through
//! [`StudySession::accept_agent_turn`].
//!
//! The floor strictly alternates. The only multi-step agent utterance is the
//! answer to the elaboration offer, where `Disclose -> Elaborate -> Challenge`
//! happens inside one agent turn.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    case_db::CaseFact,
    generic_types::{Party, Turn},
    intent::{self, CheckpointChoice, Consent},
    phase::Phase,
    scenario::{Position, Scenario},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("the discussion has ended")]
    Terminated,
    #[error("it is the {0}'s turn to speak")]
    OutOfTurn(Party),
    #[error("the scenario has already been presented")]
    AlreadyOpened,
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("no case lookup is pending")]
    NoPendingLookup,
    #[error("the case lookup must finish before the agent speaks")]
    LookupPending,
}

/// What the user's opening reply was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingOpening {
    Position,
    Rationale,
}

/// Case support attached to the challenge that follows the elaboration offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elaboration {
    /// The user declined, or did not clearly accept.
    NotRequested,
    Facts(Vec<CaseFact>),
    /// The user accepted but the lookup failed or came back empty.
    Unavailable,
}

/// What the next agent utterance has to accomplish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    PresentScenario,
    RequestOpening { missing: MissingOpening },
    DisclosePosition { agent_choice: usize },
    /// A case lookup must run and be passed to
    /// [`StudySession::finish_elaboration`] before anything is said.
    Elaborate { query: String },
    Challenge { elaboration: Elaboration },
    Exchange { turn: u8 },
    Checkpoint,
    ClarifyCheckpoint,
    Summary,
    Farewell,
}

/// State of one case discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    scenario: Scenario,
    phase: Phase,
    floor: Party,
    user_position: Option<Position>,
    /// A position named without an argument, kept until the argument arrives.
    tentative_choice: Option<usize>,
    opening_argument: Option<String>,
    agent_position: Option<Position>,
    pending_lookup: Option<String>,
    checkpoints: u32,
    turns: Vec<Turn>,
}

impl StudySession {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            phase: Phase::Init,
            floor: Party::Agent,
            user_position: None,
            tentative_choice: None,
            opening_argument: None,
            agent_position: None,
            pending_lookup: None,
            checkpoints: 0,
            turns: Vec::new(),
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Party expected to speak next.
    pub fn floor(&self) -> Party {
        self.floor
    }

    pub fn user_position(&self) -> Option<Position> {
        self.user_position
    }

    pub fn agent_position(&self) -> Option<Position> {
        self.agent_position
    }

    pub fn opening_argument(&self) -> Option<&str> {
        self.opening_argument.as_deref()
    }

    /// Number of checkpoints reached so far.
    pub fn checkpoints(&self) -> u32 {
        self.checkpoints
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn user_option(&self) -> Option<&str> {
        self.user_position
            .and_then(|p| self.scenario.option(p.choice))
    }

    pub fn agent_option(&self) -> Option<&str> {
        self.agent_position
            .and_then(|p| self.scenario.option(p.choice))
    }

    /// Returns the directive for the very first agent message.
    pub fn opening(&self) -> Result<Directive, SessionError> {
        if self.phase != Phase::Init || !self.turns.is_empty() {
            return Err(SessionError::AlreadyOpened);
        }
        Ok(Directive::PresentScenario)
    }

    /// Records a user reply and decides what the agent must do next.
    pub fn accept_user_turn(&mut self, text: &str) -> Result<Directive, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::Terminated);
        }
        if self.floor != Party::User {
            return Err(SessionError::OutOfTurn(self.floor));
        }
        self.turns.push(Turn::new(Party::User, text, self.phase));
        self.floor = Party::Agent;

        match self.phase {
            Phase::Init => self.read_opening(text),
            Phase::Disclose => match intent::consent(text) {
                Consent::Yes => {
                    self.transition(Phase::Elaborate)?;
                    let query = self.lookup_query();
                    self.pending_lookup = Some(query.clone());
                    Ok(Directive::Elaborate { query })
                }
                Consent::No | Consent::Unclear => {
                    self.transition(Phase::Challenge)?;
                    Ok(Directive::Challenge {
                        elaboration: Elaboration::NotRequested,
                    })
                }
            },
            Phase::Exchange { agent_turns } => {
                if self.phase.checkpoint_due() {
                    self.transition(Phase::Checkpoint)?;
                    self.checkpoints += 1;
                    Ok(Directive::Checkpoint)
                } else {
                    Ok(Directive::Exchange {
                        turn: agent_turns + 1,
                    })
                }
            }
            Phase::Checkpoint => match intent::checkpoint_choice(text) {
                CheckpointChoice::Continue => {
                    self.transition(Phase::Exchange { agent_turns: 0 })?;
                    Ok(Directive::Exchange { turn: 1 })
                }
                CheckpointChoice::End => {
                    self.transition(Phase::Summary)?;
                    Ok(Directive::Summary)
                }
                CheckpointChoice::Unclear => {
                    self.transition(Phase::Checkpoint)?;
                    Ok(Directive::ClarifyCheckpoint)
                }
            },
            Phase::Summary => {
                self.transition(Phase::Terminated)?;
                Ok(Directive::Farewell)
            }
            Phase::PositionSelect | Phase::Elaborate | Phase::Challenge | Phase::Terminated => {
                // Transient phases never hold the floor for the user.
                Err(SessionError::OutOfTurn(Party::Agent))
            }
        }
    }

    fn read_opening(&mut self, text: &str) -> Result<Directive, SessionError> {
        let claim = intent::detect_position(&self.scenario, text);
        let (choice, has_rationale) = match (claim, self.tentative_choice) {
            (Some(claim), _) => (claim.choice, claim.has_rationale),
            // Position named earlier, argument arriving now.
            (None, Some(choice)) => (choice, intent::has_argument(text)),
            (None, None) => {
                self.transition(Phase::Init)?;
                return Ok(Directive::RequestOpening {
                    missing: MissingOpening::Position,
                });
            }
        };

        if !has_rationale {
            self.tentative_choice = Some(choice);
            self.transition(Phase::Init)?;
            return Ok(Directive::RequestOpening {
                missing: MissingOpening::Rationale,
            });
        }

        self.user_position = Some(Position {
            owner: Party::User,
            choice,
        });
        self.opening_argument = Some(text.to_string());
        self.tentative_choice = None;
        self.transition(Phase::PositionSelect)?;

        let agent_choice = self.scenario.alternate_to(choice);
        self.agent_position = Some(Position {
            owner: Party::Agent,
            choice: agent_choice,
        });
        self.transition(Phase::Disclose)?;
        Ok(Directive::DisclosePosition { agent_choice })
    }

    /// Consumes the single pending case lookup and moves on to the challenge.
    pub fn finish_elaboration(&mut self, facts: Vec<CaseFact>) -> Result<Directive, SessionError> {
        if self.phase != Phase::Elaborate {
            return Err(SessionError::NoPendingLookup);
        }
        self.pending_lookup
            .take()
            .ok_or(SessionError::NoPendingLookup)?;
        self.transition(Phase::Challenge)?;
        let elaboration = if facts.is_empty() {
            Elaboration::Unavailable
        } else {
            Elaboration::Facts(facts)
        };
        Ok(Directive::Challenge { elaboration })
    }

    /// Records the rendered agent utterance and applies the transitions that
    /// follow speaking.
    pub fn accept_agent_turn(&mut self, text: &str) -> Result<(), SessionError> {
        if self.floor != Party::Agent {
            return Err(SessionError::OutOfTurn(Party::User));
        }
        if self.phase == Phase::Elaborate {
            return Err(SessionError::LookupPending);
        }
        self.turns.push(Turn::new(Party::Agent, text, self.phase));
        self.floor = Party::User;

        match self.phase {
            Phase::Challenge => self.transition(Phase::Exchange { agent_turns: 0 })?,
            Phase::Exchange { agent_turns } => self.transition(Phase::Exchange {
                agent_turns: agent_turns + 1,
            })?,
            _ => {}
        }
        Ok(())
    }

    fn lookup_query(&self) -> String {
        let agent = self.agent_option().unwrap_or_default();
        let user = self.user_option().unwrap_or_default();
        format!(
            "{} Case evidence for '{}' over '{}'. Student's argument: {}",
            self.scenario.question,
            agent,
            user,
            self.opening_argument().unwrap_or_default()
        )
    }

    fn transition(&mut self, to: Phase) -> Result<(), SessionError> {
        if !self.phase.can_transition_to(&to) {
            return Err(SessionError::InvalidTransition {
                from: self.phase.label(),
                to: to.label(),
            });
        }
        info!(from = self.phase.label(), to = to.label(), "Phase transition");
        self.phase = to;
        Ok(())
    }
}
