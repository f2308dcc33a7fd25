//! Outbound session commands and the errors that stop them locally.

use serde_json::{json, Value};
use thiserror::Error;

/// A request the local user sends to the session service.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Join {
        session_id: String,
        user_id: String,
        display_name: String,
    },
    Vote {
        session_id: String,
        user_id: String,
        value: f64,
    },
    Reveal {
        session_id: String,
    },
    Finalize {
        session_id: String,
        value: f64,
    },
    ResetRound {
        session_id: String,
    },
}

impl SessionCommand {
    pub fn session_id(&self) -> &str {
        match self {
            SessionCommand::Join { session_id, .. }
            | SessionCommand::Vote { session_id, .. }
            | SessionCommand::Reveal { session_id }
            | SessionCommand::Finalize { session_id, .. }
            | SessionCommand::ResetRound { session_id } => session_id,
        }
    }

    /// Action segment of the command's endpoint.
    pub fn action(&self) -> &'static str {
        match self {
            SessionCommand::Join { .. } => "join",
            SessionCommand::Vote { .. } => "vote",
            SessionCommand::Reveal { .. } => "reveal",
            SessionCommand::Finalize { .. } => "finalize",
            SessionCommand::ResetRound { .. } => "reset",
        }
    }

    /// JSON body sent with the command.
    pub fn body(&self) -> Value {
        match self {
            SessionCommand::Join {
                session_id,
                user_id,
                display_name,
            } => json!({
                "sessionId": session_id,
                "userId": user_id,
                "displayName": display_name,
            }),
            SessionCommand::Vote {
                session_id,
                user_id,
                value,
            } => json!({
                "sessionId": session_id,
                "userId": user_id,
                "value": value,
            }),
            SessionCommand::Finalize { session_id, value } => json!({
                "sessionId": session_id,
                "value": value,
            }),
            SessionCommand::Reveal { session_id } | SessionCommand::ResetRound { session_id } => {
                json!({ "sessionId": session_id })
            }
        }
    }
}

/// Why a local action was refused. Nothing is sent when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("invalid value: {0}")]
    InvalidInput(String),

    #[error("you are not a participant of this session")]
    NotAParticipant,

    #[error("you already voted this round")]
    AlreadyVoted,

    #[error("nobody has joined the session yet")]
    NoParticipants,

    #[error("{remaining} participant(s) still have to vote")]
    VotesOutstanding { remaining: usize },

    #[error("votes are already revealed")]
    AlreadyRevealed,

    #[error("votes have not been revealed yet")]
    NotRevealed,

    #[error("a final value was already agreed")]
    AlreadyConcluded,

    #[error("a {0} request is already waiting for the server")]
    Pending(&'static str),

    #[error("the session view has been closed")]
    Disposed,
}

impl ActionError {
    /// True when the action was refused because of session state rather than input.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, ActionError::InvalidInput(_) | ActionError::Disposed)
    }
}

/// Parse user-entered text into a vote or final value.
pub fn parse_value(input: &str) -> Result<f64, ActionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ActionError::InvalidInput("a value is required".to_string()));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| ActionError::InvalidInput(format!("{trimmed:?} is not a number")))?;

    ensure_finite(value)
}

/// Reject NaN and infinities.
pub fn ensure_finite(value: f64) -> Result<f64, ActionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ActionError::InvalidInput(format!("{value} is not a finite number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_decimals() {
        assert_eq!(parse_value(" 0.5 ").unwrap(), 0.5);
        assert_eq!(parse_value("13").unwrap(), 13.0);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        for input in ["", "   ", "abc", "NaN", "inf", "-infinity", "5pts"] {
            assert!(
                matches!(parse_value(input), Err(ActionError::InvalidInput(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_command_routes_and_bodies() {
        let vote = SessionCommand::Vote {
            session_id: "s1".to_string(),
            user_id: "a".to_string(),
            value: 5.0,
        };
        assert_eq!(vote.action(), "vote");
        assert_eq!(vote.session_id(), "s1");
        assert_eq!(vote.body()["userId"], "a");
        assert_eq!(vote.body()["value"], 5.0);

        let reset = SessionCommand::ResetRound {
            session_id: "s1".to_string(),
        };
        assert_eq!(reset.action(), "reset");
        assert_eq!(reset.body(), json!({ "sessionId": "s1" }));
    }

    #[test]
    fn test_precondition_classification() {
        assert!(ActionError::AlreadyVoted.is_precondition());
        assert!(ActionError::VotesOutstanding { remaining: 1 }.is_precondition());
        assert!(!ActionError::Disposed.is_precondition());
        assert!(!ActionError::InvalidInput("x".to_string()).is_precondition());
    }
}
