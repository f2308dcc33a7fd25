//! Server-pushed session events.

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;
use crate::models::{Participant, Session};

/// Event names as they appear on the push channel.
pub mod names {
    pub const FULL_STATE: &str = "full-state";
    pub const PARTICIPANTS_CHANGED: &str = "participants-changed";
    pub const VOTE_RECORDED: &str = "vote-recorded";
    pub const VOTES_REVEALED: &str = "votes-revealed";
    pub const FINAL_VALUE_SET: &str = "final-value-set";
}

/// Complete session state plus its participant list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: Session,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// A participant submitted a vote. Carries no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecorded {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub user_id: String,
}

/// The team agreed on a value for the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalValueSet {
    pub session_id: String,
    pub story_id: String,
    pub value: f64,
}

/// Every event the session view can receive from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    FullState(SessionSnapshot),
    ParticipantsChanged(SessionSnapshot),
    VoteRecorded(VoteRecorded),
    VotesRevealed(SessionSnapshot),
    FinalValueSet(FinalValueSet),
}

impl SessionEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::FullState(_) => names::FULL_STATE,
            SessionEvent::ParticipantsChanged(_) => names::PARTICIPANTS_CHANGED,
            SessionEvent::VoteRecorded(_) => names::VOTE_RECORDED,
            SessionEvent::VotesRevealed(_) => names::VOTES_REVEALED,
            SessionEvent::FinalValueSet(_) => names::FINAL_VALUE_SET,
        }
    }

    /// Decode an event from its name and JSON payload.
    ///
    /// Unknown names yield `Ok(None)` so the server can add event types
    /// (keep-alives, presence) without breaking older clients.
    pub fn decode(name: &str, data: &str) -> Result<Option<Self>, ClientError> {
        let event = match name {
            names::FULL_STATE => SessionEvent::FullState(serde_json::from_str(data)?),
            names::PARTICIPANTS_CHANGED => {
                SessionEvent::ParticipantsChanged(serde_json::from_str(data)?)
            }
            names::VOTE_RECORDED => SessionEvent::VoteRecorded(serde_json::from_str(data)?),
            names::VOTES_REVEALED => SessionEvent::VotesRevealed(serde_json::from_str(data)?),
            names::FINAL_VALUE_SET => SessionEvent::FinalValueSet(serde_json::from_str(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// JSON payload of this event, the inverse of [`SessionEvent::decode`].
    pub fn payload(&self) -> Result<String, ClientError> {
        let data = match self {
            SessionEvent::FullState(snapshot)
            | SessionEvent::ParticipantsChanged(snapshot)
            | SessionEvent::VotesRevealed(snapshot) => serde_json::to_string(snapshot)?,
            SessionEvent::VoteRecorded(vote) => serde_json::to_string(vote)?,
            SessionEvent::FinalValueSet(fin) => serde_json::to_string(fin)?,
        };
        Ok(data)
    }
}
