//! Defines the WebSocket message protocol between the browser client and the API server.

use crate::models;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Attaches the connection to a session created over REST. This must be the first message.
    #[serde(rename = "init")]
    Init {
        /// The session to resume.
        session_id: Uuid,
        /// The owner of the session, as sent in `x-user-id` over REST.
        user_id: String,
    },
    /// A text reply from the student.
    #[serde(rename = "user_message")]
    UserMessage { text: String },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms initialization and replays the transcript so far.
    Initialized {
        session_id: Uuid,
        phase: String,
        history: Vec<models::Message>,
    },
    /// The discussion moved to another phase.
    PhaseUpdate { phase: String },
    /// Reports an error to the client.
    Error { message: String },
    /// Signals the beginning of an agent reply.
    ResponseStart,
    /// A chunk of an agent reply.
    ResponseChunk { chunk: String },
    /// Signals the end of an agent reply.
    ResponseEnd,
    /// The discussion is over; carries the closing message.
    SessionComplete { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_init_requires_session_and_user() {
        let id = Uuid::new_v4();
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "init",
            "session_id": id,
            "user_id": "alice"
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Init {
                session_id: id,
                user_id: "alice".to_string()
            }
        );

        let missing = serde_json::from_value::<ClientMessage>(json!({ "type": "init" }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_user_message_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"user_message","text":"yes please"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::UserMessage {
                text: "yes please".to_string()
            }
        );
    }

    #[test]
    fn test_server_messages_are_snake_case_tagged() {
        let value = serde_json::to_value(ServerMessage::PhaseUpdate {
            phase: "checkpoint".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "phase_update", "phase": "checkpoint" }));

        let value = serde_json::to_value(ServerMessage::ResponseEnd).unwrap();
        assert_eq!(value, json!({ "type": "response_end" }));

        let value = serde_json::to_value(ServerMessage::SessionComplete {
            message: "Bye.".to_string(),
        })
        .unwrap();
        assert_eq!(value["type"], "session_complete");
    }
}
