pub mod case_db;
pub mod conductor;
pub mod generic_types;
pub mod intent;
pub mod llm_client;
pub mod phase;
pub mod prompt;
pub mod scenario;
pub mod session;
pub mod utterance;

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum is the primary API for decoupling the discussion logic from the
/// runtime's execution of side effects (like speaking text or finalizing a
/// session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Command the runtime to speak the given text to the user.
    SpeakText(String),
    /// Command indicating the session is complete, with a final message.
    SessionComplete(String),
}

impl Command {
    pub fn text(&self) -> &str {
        match self {
            Command::SpeakText(text) | Command::SessionComplete(text) => text,
        }
    }
}
