//! Event delivery to live connections.
//!
//! Every live socket gets a bounded outbound queue the moment it attaches,
//! joined or not. Delivery is `try_send` fire-and-forget: a full queue or a
//! dead peer drops that one send and never blocks or fails the others.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::ServerEvent;
use crate::registry::{ConnectionId, Registry, Role};

#[derive(Debug, Default)]
pub struct Dispatcher {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection; the returned receiver feeds its socket writer.
    pub fn add(&mut self, id: ConnectionId, queue_size: usize) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(queue_size);
        self.connections.insert(id, tx);
        rx
    }

    /// Detach a connection. Dropping the sender ends its writer task.
    pub fn remove(&mut self, id: &str) {
        self.connections.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn to_connection(&self, id: &str, event: &ServerEvent) {
        if let Some(tx) = self.connections.get(id) {
            if tx.try_send(event.clone()).is_err() {
                debug!(connection = %id, "dropping event for unreachable connection");
            }
        }
    }

    pub fn to_all(&self, event: &ServerEvent) {
        for (id, tx) in &self.connections {
            if tx.try_send(event.clone()).is_err() {
                debug!(connection = %id, "dropping event for unreachable connection");
            }
        }
    }

    /// Deliver to every registered participant holding `role`.
    pub fn to_role(&self, registry: &Registry, role: Role, event: &ServerEvent) {
        for participant in registry.list_by_role(role) {
            self.to_connection(&participant.id, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn to_all_reaches_every_connection() {
        let mut dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.add("c1".into(), 8);
        let mut rx2 = dispatcher.add("c2".into(), 8);

        dispatcher.to_all(&ServerEvent::Kicked);
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[test]
    fn to_connection_targets_one_peer() {
        let mut dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.add("c1".into(), 8);
        let mut rx2 = dispatcher.add("c2".into(), 8);

        dispatcher.to_connection("c2", &ServerEvent::error("nope"));
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[test]
    fn to_role_resolves_against_the_registry() {
        let mut registry = Registry::new();
        registry.register("t1", Role::Teacher, None).unwrap();
        registry.register("c1", Role::Student, Some("Alice")).unwrap();

        let mut dispatcher = Dispatcher::new();
        let mut teacher_rx = dispatcher.add("t1".into(), 8);
        let mut student_rx = dispatcher.add("c1".into(), 8);

        dispatcher.to_role(&registry, Role::Teacher, &ServerEvent::Kicked);
        assert_eq!(drain(&mut teacher_rx).len(), 1);
        assert!(drain(&mut student_rx).is_empty());
    }

    #[test]
    fn full_queue_drops_without_failing_others() {
        let mut dispatcher = Dispatcher::new();
        let mut tiny = dispatcher.add("tiny".into(), 1);
        let mut roomy = dispatcher.add("roomy".into(), 8);

        dispatcher.to_all(&ServerEvent::Kicked);
        dispatcher.to_all(&ServerEvent::Kicked);

        assert_eq!(drain(&mut tiny).len(), 1);
        assert_eq!(drain(&mut roomy).len(), 2);
    }
}
