//! Wire protocol
//!
//! Inbound commands and outbound events as internally-tagged JSON:
//! snake_case `type` tags, camelCase payload fields. The state machine and
//! room emit [`ServerEvent`]s; the transport layer only serializes and
//! delivers them.

use serde::{Deserialize, Serialize};

use crate::poll::{PollSnapshot, ResultsMap};
use crate::registry::{ConnectionId, Participant, Role};

/// Client → server commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    TeacherJoin,
    StudentJoin {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    CreatePoll {
        question: String,
        options: Vec<String>,
        #[serde(default)]
        time_limit: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        poll_id: String,
        answer: String,
    },
    EndPoll,
    #[serde(rename_all = "camelCase")]
    KickStudent {
        student_id: ConnectionId,
    },
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Echo to the connection that just completed registration.
    JoinedSuccess {
        id: ConnectionId,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        role: Role,
    },
    /// Full poll definition, no answers. Broadcast on create and replayed
    /// individually on catch-up.
    PollCreated {
        #[serde(flatten)]
        poll: PollSnapshot,
    },
    /// Complete answer snapshot, not a delta.
    #[serde(rename_all = "camelCase")]
    PollUpdated {
        poll_id: String,
        results: ResultsMap,
    },
    #[serde(rename_all = "camelCase")]
    PollEnded {
        poll_id: String,
        final_results: ResultsMap,
    },
    /// Sent to teachers when a student registers.
    StudentJoined {
        #[serde(flatten)]
        participant: Participant,
    },
    /// Broadcast to everyone when a student disconnects or is kicked.
    StudentLeft {
        id: ConnectionId,
    },
    /// Sent to exactly the kicked connection.
    Kicked,
    /// Sent to exactly the connection whose command failed.
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn joined_success(participant: &Participant) -> Self {
        Self::JoinedSuccess {
            id: participant.id.clone(),
            name: participant.name.clone(),
            role: participant.role,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_parse_from_tagged_json() {
        let command: ClientCommand = serde_json::from_value(json!({
            "type": "create_poll",
            "question": "Color?",
            "options": ["Red", "Blue"],
            "timeLimit": 30,
        }))
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::CreatePoll {
                question: "Color?".into(),
                options: vec!["Red".into(), "Blue".into()],
                time_limit: Some(30),
            }
        );

        let command: ClientCommand =
            serde_json::from_value(json!({ "type": "teacher_join" })).unwrap();
        assert_eq!(command, ClientCommand::TeacherJoin);

        let command: ClientCommand = serde_json::from_value(json!({
            "type": "submit_answer",
            "pollId": "p1",
            "answer": "Red",
        }))
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::SubmitAnswer { poll_id: "p1".into(), answer: "Red".into() }
        );
    }

    #[test]
    fn time_limit_defaults_to_absent() {
        let command: ClientCommand = serde_json::from_value(json!({
            "type": "create_poll",
            "question": "Q?",
            "options": ["A", "B"],
        }))
        .unwrap();
        assert!(matches!(command, ClientCommand::CreatePoll { time_limit: None, .. }));
    }

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = ServerEvent::PollUpdated { poll_id: "p1".into(), results: ResultsMap::new() };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "poll_updated");
        assert_eq!(value["pollId"], "p1");

        let value = serde_json::to_value(ServerEvent::Kicked).unwrap();
        assert_eq!(value, json!({ "type": "kicked" }));

        let participant = Participant {
            id: "c1".into(),
            role: Role::Student,
            name: Some("Alice".into()),
        };
        let value = serde_json::to_value(ServerEvent::StudentJoined { participant }).unwrap();
        assert_eq!(value["type"], "student_joined");
        assert_eq!(value["id"], "c1");
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["role"], "student");
    }

    #[test]
    fn poll_created_flattens_the_snapshot() {
        let poll = crate::poll::Poll::new("Color?".into(), vec!["Red".into(), "Blue".into()], None);
        let event = ServerEvent::PollCreated { poll: PollSnapshot::from(&poll) };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "poll_created");
        assert_eq!(value["question"], "Color?");
        assert_eq!(value["timeLimit"], 60);
        assert_eq!(value["isActive"], true);
    }
}
