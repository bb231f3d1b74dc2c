//! Table endpoints (`/rest/v1`) for polls and votes.

use serde::Deserialize;
use uuid::Uuid;

use super::{Backend, BackendResult, send_empty, send_json};
use crate::model::{NewPoll, NewVote, Poll, PollId, VoteCount};

const POLLS: &str = "polls";
const VOTES: &str = "votes";

/// Table access authorized as one user (or anonymously).
pub struct Rest<'a> {
    backend: &'a Backend,
    access_token: Option<String>,
}

impl<'a> Rest<'a> {
    pub(super) fn new(backend: &'a Backend, access_token: Option<String>) -> Self {
        Self {
            backend,
            access_token,
        }
    }

    fn get(&self, table: &str) -> reqwest::RequestBuilder {
        self.backend
            .http
            .get(self.backend.rest_url(table))
            .headers(self.backend.headers(self.access_token.as_deref()))
    }

    fn insert(&self, table: &str) -> reqwest::RequestBuilder {
        self.backend
            .http
            .post(self.backend.rest_url(table))
            .headers(self.backend.headers(self.access_token.as_deref()))
            .header("Prefer", "return=minimal")
    }

    /// All polls, newest first.
    ///
    /// # Errors
    /// Returns the backend's error.
    pub async fn list_polls(&self) -> BackendResult<Vec<Poll>> {
        tracing::debug!("fetching polls");
        let request = self
            .get(POLLS)
            .query(&[("select", "*"), ("order", "createdAt.desc")]);
        send_json(request).await
    }

    /// One poll by id; `None` when no row matches.
    ///
    /// # Errors
    /// Returns the backend's error.
    pub async fn get_poll(&self, id: PollId) -> BackendResult<Option<Poll>> {
        tracing::debug!(poll_id = id, "fetching poll");
        let request = self.get(POLLS).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Poll> = send_json(request).await?;
        Ok(rows.into_iter().next())
    }

    /// # Errors
    /// Returns the backend's error.
    pub async fn insert_poll(&self, poll: &NewPoll) -> BackendResult<()> {
        tracing::debug!(options = poll.options.len(), "inserting poll");
        send_empty(self.insert(POLLS).json(poll)).await
    }

    /// # Errors
    /// Returns the backend's error; a repeat vote fails with
    /// [`super::UNIQUE_VIOLATION`].
    pub async fn insert_vote(&self, vote: &NewVote) -> BackendResult<()> {
        tracing::debug!(poll_id = vote.poll_id, "inserting vote");
        send_empty(self.insert(VOTES).json(vote)).await
    }

    /// Vote counts grouped by option value.
    ///
    /// # Errors
    /// Returns the backend's error.
    pub async fn vote_counts(&self, poll_id: PollId) -> BackendResult<Vec<VoteCount>> {
        let request = self.get(VOTES).query(&[
            ("select", "option_value,count()".to_string()),
            ("poll_id", format!("eq.{poll_id}")),
        ]);
        send_json(request).await
    }

    /// The option `voter_id` already voted for on this poll, if any.
    ///
    /// # Errors
    /// Returns the backend's error.
    pub async fn find_vote(
        &self,
        poll_id: PollId,
        voter_id: Uuid,
    ) -> BackendResult<Option<String>> {
        #[derive(Deserialize)]
        struct Row {
            option_value: String,
        }

        let request = self.get(VOTES).query(&[
            ("select", "option_value".to_string()),
            ("poll_id", format!("eq.{poll_id}")),
            ("voter_id", format!("eq.{voter_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Row> = send_json(request).await?;
        Ok(rows.into_iter().next().map(|row| row.option_value))
    }
}
