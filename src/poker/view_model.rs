//! Planning Poker session view model.
//!
//! Folds server-pushed events into the observed session state and decides
//! which actions the local user may take. The server is the only source of
//! truth: local actions never touch confirmed state, they only record a
//! pending request next to it until the matching event arrives.

use std::fmt;

use crate::models::Participant;

use super::commands::{ensure_finite, ActionError, SessionCommand};
use super::events::{FinalValueSet, SessionEvent, SessionSnapshot, VoteRecorded};

/// Identity of the user driving this view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUser {
    pub user_id: String,
    pub display_name: String,
}

impl LocalUser {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Push channel connectivity as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Where the current round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Voting,
    RevealEligible,
    Revealed,
    Concluded,
}

/// How many participants voted, for progress display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingProgress {
    pub voted: usize,
    pub total: usize,
}

impl fmt::Display for VotingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.voted, self.total)
    }
}

/// Server-confirmed session state.
///
/// While `revealed` is false no participant carries a vote value; values are
/// dropped at ingestion even if a payload included them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    session_id: String,
    story_id: Option<String>,
    title: String,
    revealed: bool,
    final_value: Option<f64>,
    participants: Vec<Participant>,
}

impl SessionState {
    fn empty(session_id: String) -> Self {
        Self {
            session_id,
            story_id: None,
            title: String::new(),
            revealed: false,
            final_value: None,
            participants: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn story_id(&self) -> Option<&str> {
        self.story_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub fn final_value(&self) -> Option<f64> {
        self.final_value
    }

    pub fn participants(&self) -> impl Iterator<Item = ParticipantView<'_>> {
        let revealed = self.revealed;
        self.participants
            .iter()
            .map(move |p| ParticipantView { inner: p, revealed })
    }

    pub fn participant(&self, user_id: &str) -> Option<ParticipantView<'_>> {
        self.participants
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| ParticipantView {
                inner: p,
                revealed: self.revealed,
            })
    }

    fn replace_session_fields(&mut self, snapshot: &SessionSnapshot) {
        self.story_id = Some(snapshot.session.story_id.clone());
        self.title = snapshot.session.title.clone();
        self.revealed = snapshot.session.revealed;
        self.final_value = snapshot.session.final_value.filter(|v| v.is_finite());
    }

    fn replace_participants(&mut self, incoming: Vec<Participant>) {
        let mut participants: Vec<Participant> = Vec::with_capacity(incoming.len());
        for participant in incoming {
            match participants
                .iter_mut()
                .find(|p| p.user_id == participant.user_id)
            {
                Some(existing) => *existing = participant,
                None => participants.push(participant),
            }
        }

        if !self.revealed {
            for p in &mut participants {
                p.vote_value = None;
            }
        }

        self.participants = participants;
    }
}

/// Read-only view of a participant that hides the vote until reveal.
#[derive(Debug, Clone, Copy)]
pub struct ParticipantView<'a> {
    inner: &'a Participant,
    revealed: bool,
}

impl<'a> ParticipantView<'a> {
    pub fn user_id(&self) -> &'a str {
        &self.inner.user_id
    }

    pub fn display_name(&self) -> &'a str {
        &self.inner.display_name
    }

    pub fn has_voted(&self) -> bool {
        self.inner.has_voted
    }

    /// The submitted value, `None` until votes are revealed.
    pub fn vote_value(&self) -> Option<f64> {
        if self.revealed {
            self.inner.vote_value
        } else {
            None
        }
    }
}

/// Requests sent upstream that the server has not confirmed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingActions {
    pub vote: Option<f64>,
    pub reveal: bool,
    pub final_value: Option<f64>,
    pub reset: bool,
}

impl PendingActions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop whatever `state` now confirms; everything else stays pending.
    fn settle(&mut self, state: &SessionState, user_id: &str) {
        match state.participants.iter().find(|p| p.user_id == user_id) {
            Some(p) if p.has_voted => self.vote = None,
            Some(_) => {}
            None => self.vote = None,
        }
        if state.revealed {
            self.reveal = false;
        } else {
            self.reset = false;
        }
        if state.final_value.is_some() {
            self.final_value = None;
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Ignored(IgnoreReason),
    /// The view was disposed before the event arrived.
    Discarded,
}

/// Why an event left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    ForeignSession,
    ForeignStory,
    UnknownParticipant,
    InvalidValue,
}

/// Observed state of one Planning Poker session plus the local user's permissions.
#[derive(Debug, Clone)]
pub struct SessionViewModel {
    user: LocalUser,
    state: SessionState,
    pending: PendingActions,
    status: ConnectionStatus,
    resyncing: bool,
    disposed: bool,
}

impl SessionViewModel {
    /// Open an empty view for `session_id`; the first `full-state` populates it.
    pub fn new(session_id: impl Into<String>, user: LocalUser) -> Self {
        Self {
            user,
            state: SessionState::empty(session_id.into()),
            pending: PendingActions::default(),
            status: ConnectionStatus::default(),
            resyncing: false,
            disposed: false,
        }
    }

    // ==================== EVENTS ====================

    /// Fold one server event into the state.
    pub fn apply(&mut self, event: SessionEvent) -> ApplyOutcome {
        if self.disposed {
            tracing::debug!(event = event.name(), "Discarding event after dispose");
            return ApplyOutcome::Discarded;
        }

        let name = event.name();
        let outcome = match event {
            SessionEvent::FullState(snapshot) | SessionEvent::ParticipantsChanged(snapshot) => {
                self.apply_snapshot(snapshot)
            }
            SessionEvent::VoteRecorded(vote) => self.apply_vote_recorded(vote),
            SessionEvent::VotesRevealed(snapshot) => self.apply_votes_revealed(snapshot),
            SessionEvent::FinalValueSet(fin) => self.apply_final_value(fin),
        };

        match outcome {
            ApplyOutcome::Ignored(reason) => {
                tracing::debug!(event = name, ?reason, "Ignoring session event");
            }
            _ => {
                tracing::trace!(
                    event = name,
                    progress = %self.voting_progress(),
                    revealed = self.state.revealed,
                    "Applied session event"
                );
            }
        }

        outcome
    }

    fn check_snapshot(&self, snapshot: &SessionSnapshot) -> Option<IgnoreReason> {
        if snapshot.session.session_id != self.state.session_id {
            return Some(IgnoreReason::ForeignSession);
        }
        match &self.state.story_id {
            Some(story_id) if *story_id != snapshot.session.story_id => {
                Some(IgnoreReason::ForeignStory)
            }
            _ => None,
        }
    }

    /// `full-state` and `participants-changed` both replace the confirmed
    /// state. Pending requests they confirm are settled. The rest survive a
    /// membership change in the same round, and are dropped when a new round
    /// starts or on the first snapshot after [`resync`](Self::resync).
    fn apply_snapshot(&mut self, snapshot: SessionSnapshot) -> ApplyOutcome {
        if let Some(reason) = self.check_snapshot(&snapshot) {
            return ApplyOutcome::Ignored(reason);
        }

        let new_round =
            !snapshot.session.revealed && (self.state.revealed || self.pending.reset);

        self.state.replace_session_fields(&snapshot);
        self.state.replace_participants(snapshot.participants);

        if new_round || self.resyncing {
            self.pending.clear();
            self.resyncing = false;
        } else {
            self.pending.settle(&self.state, &self.user.user_id);
        }
        ApplyOutcome::Applied
    }

    fn apply_vote_recorded(&mut self, vote: VoteRecorded) -> ApplyOutcome {
        if vote
            .session_id
            .as_deref()
            .is_some_and(|id| id != self.state.session_id)
        {
            return ApplyOutcome::Ignored(IgnoreReason::ForeignSession);
        }

        let Some(participant) = self
            .state
            .participants
            .iter_mut()
            .find(|p| p.user_id == vote.user_id)
        else {
            return ApplyOutcome::Ignored(IgnoreReason::UnknownParticipant);
        };

        participant.has_voted = true;
        if vote.user_id == self.user.user_id {
            self.pending.vote = None;
        }
        ApplyOutcome::Applied
    }

    fn apply_votes_revealed(&mut self, mut snapshot: SessionSnapshot) -> ApplyOutcome {
        if let Some(reason) = self.check_snapshot(&snapshot) {
            return ApplyOutcome::Ignored(reason);
        }

        snapshot.session.revealed = true;
        self.state.replace_session_fields(&snapshot);
        self.state.replace_participants(snapshot.participants);
        self.pending.reveal = false;
        self.pending.vote = None;
        ApplyOutcome::Applied
    }

    fn apply_final_value(&mut self, fin: FinalValueSet) -> ApplyOutcome {
        if fin.session_id != self.state.session_id {
            return ApplyOutcome::Ignored(IgnoreReason::ForeignSession);
        }
        if self
            .state
            .story_id
            .as_deref()
            .is_some_and(|id| id != fin.story_id)
        {
            return ApplyOutcome::Ignored(IgnoreReason::ForeignStory);
        }
        if !fin.value.is_finite() {
            return ApplyOutcome::Ignored(IgnoreReason::InvalidValue);
        }

        self.state.final_value = Some(fin.value);
        self.pending.final_value = None;
        ApplyOutcome::Applied
    }

    // ==================== ACTIONS ====================

    /// Announce the local user to the session.
    pub fn join(&self) -> Result<SessionCommand, ActionError> {
        self.ensure_live()?;
        Ok(SessionCommand::Join {
            session_id: self.state.session_id.clone(),
            user_id: self.user.user_id.clone(),
            display_name: self.user.display_name.clone(),
        })
    }

    /// Submit the local user's vote for this round.
    pub fn submit_vote(&mut self, value: f64) -> Result<SessionCommand, ActionError> {
        self.ensure_live()?;
        let value = ensure_finite(value)?;

        let participant = self
            .state
            .participants
            .iter()
            .find(|p| p.user_id == self.user.user_id)
            .ok_or(ActionError::NotAParticipant)?;

        if participant.has_voted || self.pending.vote.is_some() {
            return Err(ActionError::AlreadyVoted);
        }

        self.pending.vote = Some(value);
        Ok(SessionCommand::Vote {
            session_id: self.state.session_id.clone(),
            user_id: self.user.user_id.clone(),
            value,
        })
    }

    /// Ask the server to reveal every vote.
    pub fn reveal(&mut self) -> Result<SessionCommand, ActionError> {
        self.ensure_live()?;

        if self.state.revealed {
            return Err(ActionError::AlreadyRevealed);
        }
        if self.state.participants.is_empty() {
            return Err(ActionError::NoParticipants);
        }
        let progress = self.voting_progress();
        if progress.voted < progress.total {
            return Err(ActionError::VotesOutstanding {
                remaining: progress.total - progress.voted,
            });
        }
        if self.pending.reveal {
            return Err(ActionError::Pending("reveal"));
        }

        self.pending.reveal = true;
        Ok(SessionCommand::Reveal {
            session_id: self.state.session_id.clone(),
        })
    }

    /// Record the value the team agreed on.
    pub fn set_final_value(&mut self, value: f64) -> Result<SessionCommand, ActionError> {
        self.ensure_live()?;
        let value = ensure_finite(value)?;

        if !self.state.revealed {
            return Err(ActionError::NotRevealed);
        }
        if self.state.final_value.is_some() {
            return Err(ActionError::AlreadyConcluded);
        }
        if self.pending.final_value.is_some() {
            return Err(ActionError::Pending("finalize"));
        }

        self.pending.final_value = Some(value);
        Ok(SessionCommand::Finalize {
            session_id: self.state.session_id.clone(),
            value,
        })
    }

    /// Start a fresh round for the same story.
    ///
    /// Votes stay as they are until the server confirms with a
    /// `full-state` or `participants-changed` event.
    pub fn reset_round(&mut self) -> Result<SessionCommand, ActionError> {
        self.ensure_live()?;

        if !self.state.revealed {
            return Err(ActionError::NotRevealed);
        }
        if self.pending.reset {
            return Err(ActionError::Pending("reset"));
        }

        self.pending.reset = true;
        Ok(SessionCommand::ResetRound {
            session_id: self.state.session_id.clone(),
        })
    }

    fn ensure_live(&self) -> Result<(), ActionError> {
        if self.disposed {
            Err(ActionError::Disposed)
        } else {
            Ok(())
        }
    }

    // ==================== QUERIES ====================

    pub fn user(&self) -> &LocalUser {
        &self.user
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Copy of the confirmed state, for observers and equality checks.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub fn participants(&self) -> impl Iterator<Item = ParticipantView<'_>> {
        self.state.participants()
    }

    pub fn local_participant(&self) -> Option<ParticipantView<'_>> {
        self.state.participant(&self.user.user_id)
    }

    /// Confirmed or optimistic vote by the local user.
    pub fn local_has_voted(&self) -> bool {
        self.pending.vote.is_some() || self.local_participant().is_some_and(|p| p.has_voted())
    }

    pub fn all_voted(&self) -> bool {
        !self.state.participants.is_empty() && self.state.participants.iter().all(|p| p.has_voted)
    }

    pub fn can_reveal(&self) -> bool {
        self.all_voted() && !self.state.revealed
    }

    pub fn voting_progress(&self) -> VotingProgress {
        VotingProgress {
            voted: self.state.participants.iter().filter(|p| p.has_voted).count(),
            total: self.state.participants.len(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        if self.state.revealed {
            if self.state.final_value.is_some() {
                RoundPhase::Concluded
            } else {
                RoundPhase::Revealed
            }
        } else if self.all_voted() {
            RoundPhase::RevealEligible
        } else {
            RoundPhase::Voting
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        if self.disposed {
            return;
        }
        self.status = status;
    }

    /// Called when the channel reconnects. The next snapshot is the server's
    /// full answer, so any request it does not confirm was lost.
    pub fn resync(&mut self) {
        if !self.disposed {
            self.resyncing = true;
        }
    }

    // ==================== TEARDOWN ====================

    /// Detach the view. Later events are discarded and actions refused.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.status = ConnectionStatus::Disconnected;
        self.pending.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::poker::commands::parse_value;

    const SESSION: &str = "session-1";
    const STORY: &str = "story-1";

    fn participant(id: &str, voted: bool, value: Option<f64>) -> Participant {
        Participant {
            user_id: id.to_string(),
            display_name: id.to_uppercase(),
            has_voted: voted,
            vote_value: value,
        }
    }

    fn snapshot(revealed: bool, final_value: Option<f64>, participants: Vec<Participant>) -> SessionSnapshot {
        SessionSnapshot {
            session: Session {
                session_id: SESSION.to_string(),
                story_id: STORY.to_string(),
                title: "Checkout flow".to_string(),
                revealed,
                final_value,
            },
            participants,
        }
    }

    fn view_for(user: &str) -> SessionViewModel {
        SessionViewModel::new(SESSION, LocalUser::new(user, user.to_uppercase()))
    }

    fn voting_room() -> SessionViewModel {
        let mut vm = view_for("a");
        let outcome = vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![participant("a", false, None), participant("b", false, None)],
        )));
        assert_eq!(outcome, ApplyOutcome::Applied);
        vm
    }

    fn recorded(user: &str) -> SessionEvent {
        SessionEvent::VoteRecorded(VoteRecorded {
            session_id: Some(SESSION.to_string()),
            user_id: user.to_string(),
        })
    }

    #[test]
    fn test_new_view_is_empty_voting() {
        let vm = view_for("a");

        assert_eq!(vm.phase(), RoundPhase::Voting);
        assert_eq!(vm.voting_progress(), VotingProgress { voted: 0, total: 0 });
        assert!(!vm.all_voted());
        assert!(!vm.can_reveal());
        assert_eq!(vm.connection_status(), ConnectionStatus::Disconnected);
        assert!(vm.state().story_id().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut vm = voting_room();

        let cmd = vm.submit_vote(5.0).unwrap();
        assert_eq!(
            cmd,
            SessionCommand::Vote {
                session_id: SESSION.to_string(),
                user_id: "a".to_string(),
                value: 5.0,
            }
        );
        vm.apply(recorded("a"));
        assert!(vm.state().participant("a").unwrap().has_voted());
        assert!(!vm.can_reveal());

        vm.apply(recorded("b"));
        assert!(vm.state().participant("b").unwrap().has_voted());
        assert!(vm.can_reveal());
        assert_eq!(vm.phase(), RoundPhase::RevealEligible);

        assert!(matches!(vm.reveal(), Ok(SessionCommand::Reveal { .. })));
        assert!(!vm.state().revealed(), "reveal is only confirmed by the server");
        vm.apply(SessionEvent::VotesRevealed(snapshot(
            false,
            None,
            vec![participant("a", true, Some(5.0)), participant("b", true, Some(8.0))],
        )));
        assert!(vm.state().revealed());
        assert_eq!(vm.state().participant("a").unwrap().vote_value(), Some(5.0));
        assert_eq!(vm.state().participant("b").unwrap().vote_value(), Some(8.0));
        assert_eq!(vm.phase(), RoundPhase::Revealed);

        assert!(matches!(
            vm.set_final_value(7.0),
            Ok(SessionCommand::Finalize { value, .. }) if value == 7.0
        ));
        vm.apply(SessionEvent::FinalValueSet(FinalValueSet {
            session_id: SESSION.to_string(),
            story_id: STORY.to_string(),
            value: 7.0,
        }));
        assert_eq!(vm.state().final_value(), Some(7.0));
        assert_eq!(vm.phase(), RoundPhase::Concluded);
        assert!(vm.pending().is_empty());
    }

    #[test]
    fn test_no_double_voting() {
        let mut vm = voting_room();

        vm.submit_vote(3.0).unwrap();
        let before = (vm.snapshot(), vm.pending().clone());
        assert_eq!(vm.submit_vote(5.0), Err(ActionError::AlreadyVoted));
        assert_eq!((vm.snapshot(), vm.pending().clone()), before);

        vm.apply(recorded("a"));
        let before = (vm.snapshot(), vm.pending().clone());
        assert_eq!(vm.submit_vote(5.0), Err(ActionError::AlreadyVoted));
        assert_eq!((vm.snapshot(), vm.pending().clone()), before);
    }

    #[test]
    fn test_vote_requires_local_participant() {
        let mut vm = view_for("stranger");
        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![participant("a", false, None)],
        )));

        assert_eq!(vm.submit_vote(1.0), Err(ActionError::NotAParticipant));
        assert!(vm.pending().is_empty());
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let mut vm = voting_room();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                vm.submit_vote(value),
                Err(ActionError::InvalidInput(_))
            ));
        }
        assert!(matches!(parse_value(""), Err(ActionError::InvalidInput(_))));
        assert!(!vm.local_has_voted());
        assert!(vm.pending().is_empty());
    }

    #[test]
    fn test_reveal_gating() {
        let mut vm = view_for("a");
        assert_eq!(vm.reveal(), Err(ActionError::NoParticipants));

        let mut vm = voting_room();
        vm.apply(recorded("a"));
        assert!(!vm.can_reveal());
        assert_eq!(vm.reveal(), Err(ActionError::VotesOutstanding { remaining: 1 }));
        assert!(!vm.pending().reveal);

        vm.apply(recorded("b"));
        assert!(vm.can_reveal());
        vm.reveal().unwrap();
        assert_eq!(vm.reveal(), Err(ActionError::Pending("reveal")));

        vm.apply(SessionEvent::VotesRevealed(snapshot(
            true,
            None,
            vec![participant("a", true, Some(1.0)), participant("b", true, Some(2.0))],
        )));
        assert!(!vm.can_reveal());
        assert_eq!(vm.reveal(), Err(ActionError::AlreadyRevealed));
    }

    #[test]
    fn test_optimistic_vote_does_not_count_for_reveal() {
        let mut vm = voting_room();
        vm.apply(recorded("b"));
        vm.submit_vote(2.0).unwrap();

        assert!(vm.local_has_voted());
        assert!(!vm.state().participant("a").unwrap().has_voted());
        assert!(!vm.can_reveal());
        assert_eq!(vm.pending().vote, Some(2.0));
    }

    #[test]
    fn test_votes_hidden_until_reveal() {
        let mut vm = view_for("a");
        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![participant("a", true, Some(5.0)), participant("b", true, Some(8.0))],
        )));

        assert!(vm.participants().all(|p| p.vote_value().is_none()));
        assert!(vm.snapshot().participants.iter().all(|p| p.vote_value.is_none()));

        vm.apply(SessionEvent::ParticipantsChanged(snapshot(
            false,
            None,
            vec![participant("a", true, Some(5.0))],
        )));
        assert!(vm.participants().all(|p| p.vote_value().is_none()));
    }

    #[test]
    fn test_foreign_events_leave_state_identical() {
        let mut vm = voting_room();
        vm.apply(recorded("a"));
        let before = vm.snapshot();

        let mut foreign = snapshot(true, Some(3.0), vec![participant("z", true, Some(1.0))]);
        foreign.session.session_id = "other".to_string();
        assert_eq!(
            vm.apply(SessionEvent::FullState(foreign.clone())),
            ApplyOutcome::Ignored(IgnoreReason::ForeignSession)
        );
        assert_eq!(
            vm.apply(SessionEvent::VotesRevealed(foreign.clone())),
            ApplyOutcome::Ignored(IgnoreReason::ForeignSession)
        );
        assert_eq!(
            vm.apply(SessionEvent::ParticipantsChanged(foreign)),
            ApplyOutcome::Ignored(IgnoreReason::ForeignSession)
        );
        assert_eq!(
            vm.apply(SessionEvent::VoteRecorded(VoteRecorded {
                session_id: Some("other".to_string()),
                user_id: "b".to_string(),
            })),
            ApplyOutcome::Ignored(IgnoreReason::ForeignSession)
        );
        assert_eq!(
            vm.apply(SessionEvent::FinalValueSet(FinalValueSet {
                session_id: "other".to_string(),
                story_id: STORY.to_string(),
                value: 1.0,
            })),
            ApplyOutcome::Ignored(IgnoreReason::ForeignSession)
        );

        let mut other_story = snapshot(false, None, vec![]);
        other_story.session.story_id = "story-2".to_string();
        assert_eq!(
            vm.apply(SessionEvent::FullState(other_story)),
            ApplyOutcome::Ignored(IgnoreReason::ForeignStory)
        );

        assert_eq!(vm.snapshot(), before);
    }

    #[test]
    fn test_vote_recorded_for_unknown_user_is_ignored() {
        let mut vm = voting_room();
        let before = vm.snapshot();

        assert_eq!(
            vm.apply(recorded("ghost")),
            ApplyOutcome::Ignored(IgnoreReason::UnknownParticipant)
        );
        assert_eq!(vm.snapshot(), before);
    }

    #[test]
    fn test_round_reset_clears_votes() {
        let mut vm = voting_room();
        assert_eq!(vm.reset_round(), Err(ActionError::NotRevealed));

        vm.apply(SessionEvent::VotesRevealed(snapshot(
            true,
            Some(5.0),
            vec![participant("a", true, Some(5.0)), participant("b", true, Some(8.0))],
        )));
        assert_eq!(vm.phase(), RoundPhase::Concluded);

        assert!(matches!(vm.reset_round(), Ok(SessionCommand::ResetRound { .. })));
        assert!(vm.pending().reset);
        assert_eq!(vm.reset_round(), Err(ActionError::Pending("reset")));
        // Nothing changes until the server confirms
        assert!(vm.state().revealed());

        vm.apply(SessionEvent::ParticipantsChanged(snapshot(
            false,
            None,
            vec![participant("a", false, None), participant("b", false, None)],
        )));

        assert!(!vm.state().revealed());
        assert_eq!(vm.state().final_value(), None);
        assert!(vm.participants().all(|p| !p.has_voted() && p.vote_value().is_none()));
        assert!(vm.pending().is_empty());
        assert_eq!(vm.phase(), RoundPhase::Voting);
        assert!(vm.submit_vote(13.0).is_ok());
    }

    #[test]
    fn test_final_value_gating() {
        let mut vm = voting_room();
        assert_eq!(vm.set_final_value(5.0), Err(ActionError::NotRevealed));

        vm.apply(SessionEvent::VotesRevealed(snapshot(
            true,
            None,
            vec![participant("a", true, Some(5.0)), participant("b", true, Some(8.0))],
        )));
        assert!(matches!(vm.set_final_value(f64::NAN), Err(ActionError::InvalidInput(_))));
        vm.set_final_value(5.0).unwrap();
        assert_eq!(vm.set_final_value(8.0), Err(ActionError::Pending("finalize")));

        vm.apply(SessionEvent::FinalValueSet(FinalValueSet {
            session_id: SESSION.to_string(),
            story_id: STORY.to_string(),
            value: 5.0,
        }));
        assert_eq!(vm.set_final_value(8.0), Err(ActionError::AlreadyConcluded));
    }

    #[test]
    fn test_membership_change_keeps_pending_vote() {
        let mut vm = voting_room();
        vm.submit_vote(5.0).unwrap();

        // Someone joins before the server processed the vote
        vm.apply(SessionEvent::ParticipantsChanged(snapshot(
            false,
            None,
            vec![
                participant("a", false, None),
                participant("b", false, None),
                participant("c", false, None),
            ],
        )));
        assert_eq!(vm.pending().vote, Some(5.0));
        assert_eq!(vm.submit_vote(3.0), Err(ActionError::AlreadyVoted));

        // A snapshot showing the vote confirms it
        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![
                participant("a", true, None),
                participant("b", false, None),
                participant("c", false, None),
            ],
        )));
        assert_eq!(vm.pending().vote, None);
        assert_eq!(vm.submit_vote(3.0), Err(ActionError::AlreadyVoted));
    }

    #[test]
    fn test_membership_change_keeps_pending_reveal() {
        let mut vm = voting_room();
        vm.apply(recorded("a"));
        vm.apply(recorded("b"));
        vm.reveal().unwrap();

        vm.apply(SessionEvent::ParticipantsChanged(snapshot(
            false,
            None,
            vec![participant("a", true, None), participant("b", true, None)],
        )));
        assert!(vm.pending().reveal);
        assert_eq!(vm.reveal(), Err(ActionError::Pending("reveal")));

        vm.apply(SessionEvent::FullState(snapshot(
            true,
            None,
            vec![participant("a", true, Some(5.0)), participant("b", true, Some(8.0))],
        )));
        assert!(!vm.pending().reveal);
    }

    #[test]
    fn test_resync_rolls_back_unconfirmed() {
        let mut vm = voting_room();
        vm.submit_vote(5.0).unwrap();
        vm.resync();

        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![participant("a", false, None), participant("b", true, None)],
        )));
        assert!(vm.pending().is_empty());
        assert!(!vm.local_has_voted());

        // Only the first snapshot after a reconnect rolls back
        vm.submit_vote(5.0).unwrap();
        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![participant("a", false, None), participant("b", true, None)],
        )));
        assert_eq!(vm.pending().vote, Some(5.0));
    }

    #[test]
    fn test_duplicate_participants_collapse() {
        let mut vm = view_for("a");
        vm.apply(SessionEvent::FullState(snapshot(
            false,
            None,
            vec![
                participant("a", false, None),
                participant("b", false, None),
                participant("a", true, None),
            ],
        )));

        assert_eq!(vm.voting_progress(), VotingProgress { voted: 1, total: 2 });
        assert_eq!(vm.voting_progress().to_string(), "1/2");
    }

    #[test]
    fn test_stale_event_after_dispose() {
        let mut vm = voting_room();
        vm.set_connection_status(ConnectionStatus::Connected);
        vm.dispose();
        let before = vm.snapshot();

        assert_eq!(vm.apply(recorded("b")), ApplyOutcome::Discarded);
        assert_eq!(vm.snapshot(), before);
        assert_eq!(vm.submit_vote(1.0), Err(ActionError::Disposed));
        assert_eq!(vm.join(), Err(ActionError::Disposed));

        vm.set_connection_status(ConnectionStatus::Connected);
        assert_eq!(vm.connection_status(), ConnectionStatus::Disconnected);
    }
}
