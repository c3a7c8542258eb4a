//! Wire messages exchanged with the chat client

use serde::{Deserialize, Serialize};

use crate::agent::FragmentPart;
use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    EndOfTurn,
}

/// Server -> client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Operation { operation: Operation },
    Answer { answer: FragmentPart },
    Error { error: String },
}

impl Envelope {
    pub fn start() -> Self {
        Envelope::Operation {
            operation: Operation::Start,
        }
    }

    pub fn end_of_turn() -> Self {
        Envelope::Operation {
            operation: Operation::EndOfTurn,
        }
    }

    pub fn answer(part: FragmentPart) -> Self {
        Envelope::Answer { answer: part }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            error: message.into(),
        }
    }

    pub fn is_end_of_turn(&self) -> bool {
        matches!(
            self,
            Envelope::Operation {
                operation: Operation::EndOfTurn
            }
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&ChatError> for Envelope {
    fn from(err: &ChatError) -> Self {
        Envelope::error(err.to_string())
    }
}

/// Client -> server message: one user turn
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub text: String,
}

impl InboundMessage {
    /// Decode a raw payload. Anything other than an object with a string
    /// `text` field is malformed input.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ChatError::MalformedInput(e.to_string()))?;
        if !value.is_object() {
            return Err(ChatError::MalformedInput(format!("expected an object, got {}", value)));
        }
        serde_json::from_value(value).map_err(|e| ChatError::MalformedInput(e.to_string()))
    }
}
