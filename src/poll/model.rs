//! Poll data model
//!
//! Shapes shared by the state machine, the wire protocol, and the history
//! store. Wire and history serialization use camelCase field names
//! (`timeLimit`, `startTime`, `isActive`, ...) as the browser clients and
//! stored records expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registry::{ConnectionId, Role};

pub const MIN_TIME_LIMIT_SECS: i64 = 10;
pub const MAX_TIME_LIMIT_SECS: i64 = 300;
pub const DEFAULT_TIME_LIMIT_SECS: i64 = 60;

/// Lifecycle state of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Active,
    Ended,
}

/// A poll. Question, options, and time limit are materialized once at
/// creation and never change for the poll's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Answer window in seconds, clamped to `[10, 300]`.
    pub time_limit: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: PollStatus,
}

impl Poll {
    pub fn new(question: String, options: Vec<String>, time_limit: Option<i64>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            question,
            options,
            time_limit: clamp_time_limit(time_limit),
            start_time: Utc::now(),
            end_time: None,
            status: PollStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }
}

/// Clamp a requested answer window to `[10, 300]` seconds.
///
/// Absent or non-positive requests fall back to the 60-second default.
pub fn clamp_time_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(secs) if secs > 0 => secs.clamp(MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS),
        _ => DEFAULT_TIME_LIMIT_SECS,
    }
}

/// The poll definition as carried by `poll_created` (no answers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub time_limit: i64,
    pub start_time: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&Poll> for PollSnapshot {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.clone(),
            question: poll.question.clone(),
            options: poll.options.clone(),
            time_limit: poll.time_limit,
            start_time: poll.start_time,
            is_active: poll.is_active(),
        }
    }
}

/// Identity echoed alongside a recorded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerUser {
    pub name: String,
    pub role: Role,
}

/// One student's recorded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub user: AnswerUser,
    pub submitted_at: DateTime<Utc>,
}

/// All recorded answers of a poll, keyed by connection. At most one entry
/// per connection; resubmission replaces the previous answer.
pub type ResultsMap = HashMap<ConnectionId, Answer>;

/// Per-option vote counts derived from a results map.
pub fn tally(results: &ResultsMap) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for answer in results.values() {
        *counts.entry(answer.answer.clone()).or_insert(0) += 1;
    }
    counts
}

/// A finished poll as appended to the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub question: String,
    pub options: Vec<String>,
    pub results: ResultsMap,
    pub time_limit: i64,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}
