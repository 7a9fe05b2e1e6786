//! Session registry
//!
//! Tracks every connected participant: who they are, their role, and the
//! display name students pick on join. The registry is a plain data
//! structure; broadcasting side effects of registration changes is the
//! room's job, so mutation and notification stay two separate steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Transport-assigned identifier of one live connection. Opaque to the core.
pub type ConnectionId = String;

/// Display names are capped at 30 characters after trimming.
pub const MAX_NAME_LEN: usize = 30;

/// Role a participant joined under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// A connected participant.
///
/// `name` is always present for students and always absent for teachers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ConnectionId,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Why a join was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Name must be 1 to 30 letters, numbers, or spaces")]
    InvalidName,
    #[error("Name already taken")]
    NameTaken,
}

/// Registry of currently connected participants, in insertion order.
#[derive(Debug, Default)]
pub struct Registry {
    participants: HashMap<ConnectionId, Participant>,
    order: Vec<ConnectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant under `role`.
    ///
    /// Students must supply a display name: trimmed non-empty, at most
    /// [`MAX_NAME_LEN`] characters, letters/digits/whitespace only, and not
    /// identical (case-sensitive) to any currently connected student's name.
    /// Teachers carry no name and any number may register at once.
    ///
    /// Re-registering an existing connection replaces its entry in place.
    pub fn register(
        &mut self,
        id: &str,
        role: Role,
        name: Option<&str>,
    ) -> Result<Participant, JoinError> {
        let name = match role {
            Role::Teacher => None,
            Role::Student => Some(self.validate_name(name)?),
        };
        let participant = Participant { id: id.to_string(), role, name };
        if self.participants.insert(id.to_string(), participant.clone()).is_none() {
            self.order.push(id.to_string());
        }
        Ok(participant)
    }

    fn validate_name(&self, name: Option<&str>) -> Result<String, JoinError> {
        let trimmed = name.unwrap_or_default().trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
            return Err(JoinError::InvalidName);
        }
        if !trimmed.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()) {
            return Err(JoinError::InvalidName);
        }
        let taken = self
            .participants
            .values()
            .any(|p| p.role == Role::Student && p.name.as_deref() == Some(trimmed));
        if taken {
            return Err(JoinError::NameTaken);
        }
        Ok(trimmed.to_string())
    }

    /// Remove a participant. Idempotent; returns the removed entry, if any.
    pub fn unregister(&mut self, id: &str) -> Option<Participant> {
        let removed = self.participants.remove(id);
        if removed.is_some() {
            self.order.retain(|c| c != id);
        }
        removed
    }

    pub fn lookup(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Whether `id` is a currently registered teacher.
    pub fn is_teacher(&self, id: &str) -> bool {
        matches!(self.lookup(id), Some(p) if p.role == Role::Teacher)
    }

    /// Participants holding `role`, in the order they registered.
    pub fn list_by_role(&self, role: Role) -> Vec<&Participant> {
        self.order
            .iter()
            .filter_map(|id| self.participants.get(id))
            .filter(|p| p.role == role)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_register_trims_name() {
        let mut registry = Registry::new();
        let alice = registry.register("c1", Role::Student, Some("  Alice  ")).unwrap();
        assert_eq!(alice.name.as_deref(), Some("Alice"));
        assert_eq!(alice.role, Role::Student);
    }

    #[test]
    fn student_register_rejects_bad_names() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register("c1", Role::Student, None),
            Err(JoinError::InvalidName)
        );
        assert_eq!(
            registry.register("c1", Role::Student, Some("   ")),
            Err(JoinError::InvalidName)
        );
        assert_eq!(
            registry.register("c1", Role::Student, Some("Al!ce")),
            Err(JoinError::InvalidName)
        );
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            registry.register("c1", Role::Student, Some(&long)),
            Err(JoinError::InvalidName)
        );
    }

    #[test]
    fn duplicate_student_name_is_taken() {
        let mut registry = Registry::new();
        registry.register("c1", Role::Student, Some("Alice")).unwrap();
        assert_eq!(
            registry.register("c2", Role::Student, Some("Alice")),
            Err(JoinError::NameTaken)
        );
        // Case-sensitive: a different casing is a different name.
        assert!(registry.register("c2", Role::Student, Some("alice")).is_ok());
    }

    #[test]
    fn teachers_need_no_name_and_may_coexist() {
        let mut registry = Registry::new();
        let t1 = registry.register("t1", Role::Teacher, None).unwrap();
        let t2 = registry.register("t2", Role::Teacher, Some("ignored")).unwrap();
        assert_eq!(t1.name, None);
        assert_eq!(t2.name, None);
        assert!(registry.is_teacher("t1"));
        assert!(registry.is_teacher("t2"));
        assert!(!registry.is_teacher("nobody"));
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = Registry::new();
        registry.register("c1", Role::Student, Some("Alice")).unwrap();
        assert!(registry.unregister("c1").is_some());
        assert!(registry.unregister("c1").is_none());
        assert!(registry.is_empty());
        // The name is free again.
        assert!(registry.register("c2", Role::Student, Some("Alice")).is_ok());
    }

    #[test]
    fn list_by_role_preserves_insertion_order() {
        let mut registry = Registry::new();
        registry.register("t1", Role::Teacher, None).unwrap();
        registry.register("c1", Role::Student, Some("Alice")).unwrap();
        registry.register("c2", Role::Student, Some("Bob")).unwrap();
        registry.register("c3", Role::Student, Some("Cara")).unwrap();
        registry.unregister("c2");

        let names: Vec<_> = registry
            .list_by_role(Role::Student)
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect();
        assert_eq!(names, ["Alice", "Cara"]);
        assert_eq!(registry.list_by_role(Role::Teacher).len(), 1);
    }
}
