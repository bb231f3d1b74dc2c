//! Poll detail and voting.
//!
//! ```text
//! Loading ──► NotFound
//!    │
//!    └──► Ready(NotVoted) ──submit──► Ready(Voted)
//! ```
//!
//! The tally is fetched once per load. After a successful vote it is
//! incremented locally and not re-fetched.

use chrono::Utc;

use super::{Alert, AppContext, Route};
use crate::model::{NewVote, Poll, PollId};
use crate::tally::VoteTally;

pub const MSG_NO_SELECTION: &str = "Please select an option";
pub const MSG_ALREADY_VOTED: &str = "You have already voted on this poll";
pub const MSG_NOT_FOUND: &str = "Poll not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotePhase {
    NotVoted { selected: Option<String> },
    Voted { choice: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyPoll {
    pub poll: Poll,
    pub tally: VoteTally,
    pub phase: VotePhase,
}

impl ReadyPoll {
    pub fn has_voted(&self) -> bool {
        matches!(self.phase, VotePhase::Voted { .. })
    }

    pub fn selected(&self) -> Option<&str> {
        match &self.phase {
            VotePhase::NotVoted { selected } => selected.as_deref(),
            VotePhase::Voted { choice } => Some(choice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    /// Terminal: the only action is going back
    NotFound,
    Ready(ReadyPoll),
}

/// Result of a vote submission that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was stored and counted
    Recorded,
    /// The backend already had a vote from this user; tally unchanged
    AlreadyVoted,
    /// Already in the voted state; nothing was sent
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    /// The poll is not loaded (still loading or not found)
    NotReady,
    NoSelection,
    Backend(Alert),
}

impl std::fmt::Display for VoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteError::NotReady => f.write_str("Poll is not loaded"),
            VoteError::NoSelection => f.write_str(MSG_NO_SELECTION),
            VoteError::Backend(alert) => f.write_str(&alert.message),
        }
    }
}

impl std::error::Error for VoteError {}

#[derive(Debug)]
pub struct PollDetailScreen {
    id: PollId,
    state: DetailState,
    alert: Option<Alert>,
}

impl PollDetailScreen {
    pub fn new(id: PollId) -> Self {
        Self {
            id,
            state: DetailState::Loading,
            alert: None,
        }
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }

    pub fn back() -> Route {
        Route::PollList
    }

    /// Fetches the poll, then the tally and the user's existing vote
    /// concurrently.
    pub async fn load(&mut self, ctx: &AppContext) {
        self.state = DetailState::Loading;
        let id = self.id;
        let rest = ctx.rest();

        let poll = match rest.get_poll(id).await {
            Ok(Some(poll)) => poll,
            Ok(None) => {
                tracing::debug!(poll_id = id, "poll not found");
                self.state = DetailState::NotFound;
                return;
            }
            Err(err) => {
                tracing::warn!(poll_id = id, error = %err, "failed to fetch poll");
                self.alert = Some(Alert::error("Error", err.message));
                return;
            }
        };

        let voter = ctx.session.user().map(|user| user.id);
        let mine = async {
            match voter {
                Some(voter) => rest.find_vote(id, voter).await,
                None => Ok(None),
            }
        };
        let (counts, mine) = tokio::join!(rest.vote_counts(id), mine);

        let tally = match counts {
            Ok(counts) => VoteTally::from_counts(&poll.options, &counts),
            Err(err) => {
                tracing::warn!(poll_id = id, error = %err, "failed to fetch vote counts");
                self.alert = Some(Alert::error("Error", err.message));
                VoteTally::empty(&poll.options)
            }
        };

        let phase = match mine {
            Ok(Some(choice)) => VotePhase::Voted { choice },
            Ok(None) => VotePhase::NotVoted { selected: None },
            Err(err) => {
                tracing::warn!(poll_id = id, error = %err, "failed to check existing vote");
                self.alert = Some(Alert::error("Error", err.message));
                VotePhase::NotVoted { selected: None }
            }
        };

        self.state = DetailState::Ready(ReadyPoll { poll, tally, phase });
    }

    /// Selects one option, replacing any previous selection. Returns false
    /// when selection is not possible (not ready, already voted, or not an
    /// option of this poll).
    pub fn select(&mut self, option: &str) -> bool {
        let DetailState::Ready(ready) = &mut self.state else {
            return false;
        };
        if !ready.poll.options.iter().any(|o| o == option) {
            return false;
        }
        match &mut ready.phase {
            VotePhase::NotVoted { selected } => {
                *selected = Some(option.to_string());
                true
            }
            VotePhase::Voted { .. } => false,
        }
    }

    /// Submits the selected option.
    ///
    /// # Errors
    /// `NotReady`, `NoSelection` (no network call), or `Backend` with the
    /// backend's message; the state stays `NotVoted` on error.
    pub async fn submit(&mut self, ctx: &AppContext) -> Result<VoteOutcome, VoteError> {
        let DetailState::Ready(ready) = &self.state else {
            return Err(VoteError::NotReady);
        };
        let choice = match &ready.phase {
            VotePhase::Voted { .. } => return Ok(VoteOutcome::Unchanged),
            VotePhase::NotVoted { selected: None } => return Err(VoteError::NoSelection),
            VotePhase::NotVoted {
                selected: Some(choice),
            } => choice.clone(),
        };

        let vote = NewVote {
            poll_id: self.id,
            option_value: choice.clone(),
            voter_id: ctx.session.user().map(|user| user.id),
            created_at: Utc::now(),
        };
        let result = ctx.rest().insert_vote(&vote).await;

        let DetailState::Ready(ready) = &mut self.state else {
            return Err(VoteError::NotReady);
        };
        match result {
            Ok(()) => {
                ready.tally.record(&choice);
                ready.phase = VotePhase::Voted { choice };
                tracing::info!(poll_id = self.id, "vote recorded");
                Ok(VoteOutcome::Recorded)
            }
            Err(err) if err.is_unique_violation() => {
                ready.phase = VotePhase::Voted { choice };
                self.alert = Some(Alert::info("Already voted", MSG_ALREADY_VOTED));
                Ok(VoteOutcome::AlreadyVoted)
            }
            Err(err) => {
                tracing::warn!(poll_id = self.id, error = %err, "failed to submit vote");
                Err(VoteError::Backend(Alert::error("Error", err.message)))
            }
        }
    }
}
