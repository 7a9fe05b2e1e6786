//! Poll state machine
//!
//! Owns the single active-poll slot (`Empty -> Active -> Ended`, with the
//! slot emptied again on end). Each active poll carries its answers and the
//! cancellation token of its auto-end timer; any transition out of Active
//! cancels the token so a stale timer can never touch a later poll.

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::model::{Answer, AnswerUser, Poll, PollRecord, PollSnapshot, PollStatus, ResultsMap};

/// Why a command against the poll slot was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid question")]
    InvalidQuestion,
    #[error("At least 2 valid options are required")]
    InsufficientOptions,
    #[error("Answer must be one of the poll options")]
    InvalidOption,
    #[error("No active poll or invalid poll ID")]
    NoActivePoll,
    #[error("The answer window for this poll has closed")]
    Expired,
}

/// Why a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Manual,
    TimedOut,
}

/// The poll currently accepting answers.
#[derive(Debug)]
pub struct ActivePoll {
    pub poll: Poll,
    pub results: ResultsMap,
    /// Cancels this poll's auto-end timer.
    pub timer: CancellationToken,
}

/// Result of opening a poll: what to broadcast, and the timer to arm.
#[derive(Debug)]
pub struct CreatedPoll {
    pub snapshot: PollSnapshot,
    pub timer: CancellationToken,
}

/// Result of recording an answer: the tally broadcast payload.
#[derive(Debug)]
pub struct PollUpdate {
    pub poll_id: String,
    pub results: ResultsMap,
}

/// A poll that has left the active slot.
#[derive(Debug)]
pub struct FinishedPoll {
    pub poll: Poll,
    pub results: ResultsMap,
}

impl FinishedPoll {
    pub fn record(&self) -> PollRecord {
        PollRecord {
            question: self.poll.question.clone(),
            options: self.poll.options.clone(),
            results: self.results.clone(),
            time_limit: self.poll.time_limit,
            start_time: self.poll.start_time,
            end_time: self.poll.end_time,
            is_active: false,
        }
    }
}

/// The single active-poll slot.
#[derive(Debug, Default)]
pub struct PollMachine {
    active: Option<ActivePoll>,
}

impl PollMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActivePoll> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Open a new poll.
    ///
    /// The question must be non-empty after trimming. Options are trimmed,
    /// empties dropped, duplicates collapsed to their first occurrence; at
    /// least two must remain. If a poll is already active it is replaced in
    /// place (no `poll_ended`, no history entry), but its timer is
    /// cancelled so it cannot end the successor.
    pub fn create(
        &mut self,
        question: &str,
        options: &[String],
        time_limit: Option<i64>,
    ) -> Result<CreatedPoll, PollError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PollError::InvalidQuestion);
        }

        let mut filtered: Vec<String> = Vec::with_capacity(options.len());
        for option in options {
            let trimmed = option.trim();
            if !trimmed.is_empty() && !filtered.iter().any(|o| o == trimmed) {
                filtered.push(trimmed.to_string());
            }
        }
        if filtered.len() < 2 {
            return Err(PollError::InsufficientOptions);
        }

        if let Some(replaced) = self.active.take() {
            debug!(poll_id = %replaced.poll.id, "replacing active poll");
            replaced.timer.cancel();
        }

        let poll = Poll::new(question.to_string(), filtered, time_limit);
        let snapshot = PollSnapshot::from(&poll);
        let timer = CancellationToken::new();
        self.active = Some(ActivePoll { poll, results: ResultsMap::new(), timer: timer.clone() });
        Ok(CreatedPoll { snapshot, timer })
    }

    /// Whether an answer for `poll_id` would be accepted right now.
    pub fn ensure_accepting(&self, poll_id: &str) -> Result<(), PollError> {
        let active = self.active.as_ref().ok_or(PollError::NoActivePoll)?;
        if active.poll.id != poll_id {
            return Err(PollError::NoActivePoll);
        }
        let elapsed = Utc::now().signed_duration_since(active.poll.start_time);
        if elapsed.num_seconds() >= active.poll.time_limit {
            return Err(PollError::Expired);
        }
        Ok(())
    }

    /// Record (or overwrite) one connection's answer. Last submission wins.
    pub fn submit(
        &mut self,
        conn: &str,
        poll_id: &str,
        answer: &str,
        user: AnswerUser,
    ) -> Result<PollUpdate, PollError> {
        self.ensure_accepting(poll_id)?;
        let active = self.active.as_mut().ok_or(PollError::NoActivePoll)?;
        if !active.poll.options.iter().any(|o| o == answer) {
            return Err(PollError::InvalidOption);
        }
        active.results.insert(
            conn.to_string(),
            Answer { answer: answer.to_string(), user, submitted_at: Utc::now() },
        );
        Ok(PollUpdate { poll_id: active.poll.id.clone(), results: active.results.clone() })
    }

    /// End the active poll, emptying the slot.
    ///
    /// Safe to call redundantly: a no-op returning `None` when the slot is
    /// already empty, so the timer and a manual end may race freely.
    pub fn end(&mut self, reason: EndReason) -> Option<FinishedPoll> {
        let mut active = self.active.take()?;
        active.timer.cancel();
        active.poll.end_time = Some(Utc::now());
        active.poll.status = PollStatus::Ended;
        debug!(
            poll_id = %active.poll.id,
            ?reason,
            answers = active.results.len(),
            "poll ended"
        );
        Some(FinishedPoll { poll: active.poll, results: active.results })
    }

    /// Current poll definition and answers, for catch-up replay.
    pub fn snapshot(&self) -> Option<(PollSnapshot, ResultsMap)> {
        let active = self.active.as_ref()?;
        Some((PollSnapshot::from(&active.poll), active.results.clone()))
    }
}
