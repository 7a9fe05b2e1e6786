//! The room
//!
//! One authoritative in-process state: the session registry, the active-poll
//! slot, and the outbound queues of every live socket, all behind a single
//! mutex. Every command (and the auto-end timer callback) locks it for its
//! whole read-mutate-broadcast sequence, which is what makes "read tally,
//! mutate tally, broadcast tally" atomic with respect to other commands.
//! Broadcasts never await: delivery is `try_send` into per-connection queues.

mod dispatch;

pub use dispatch::Dispatcher;

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::history::HistoryStore;
use crate::poll::{AnswerUser, EndReason, PollError, PollMachine};
use crate::protocol::ServerEvent;
use crate::registry::{JoinError, Registry, Role};

struct RoomState {
    connections: Dispatcher,
    registry: Registry,
    machine: PollMachine,
}

/// The single shared room every connection lands in.
pub struct Room {
    state: Mutex<RoomState>,
    history: Arc<dyn HistoryStore>,
    queue_size: usize,
    /// Handle the auto-end timer task uses to reach back into the room.
    weak_self: Weak<Room>,
}

impl Room {
    pub fn new(history: Arc<dyn HistoryStore>, queue_size: usize) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(RoomState {
                connections: Dispatcher::new(),
                registry: Registry::new(),
                machine: PollMachine::new(),
            }),
            history,
            queue_size,
            weak_self: weak.clone(),
        })
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Attach a live socket and return the receiver its writer drains.
    ///
    /// A connection arriving mid-poll is caught up immediately: it receives
    /// the full poll definition and the current answer snapshot as if it had
    /// been present since creation.
    pub fn connect(&self, conn: &str) -> tokio::sync::mpsc::Receiver<ServerEvent> {
        let mut state = self.state.lock();
        let rx = state.connections.add(conn.to_string(), self.queue_size);
        Self::replay_active_poll(&state, conn);
        rx
    }

    /// Detach a socket. If it belonged to a student, everyone is told.
    /// Teacher disconnection never alters poll state.
    pub fn disconnect(&self, conn: &str) {
        let mut state = self.state.lock();
        state.connections.remove(conn);
        if let Some(participant) = state.registry.unregister(conn) {
            if participant.role == Role::Student {
                state.connections.to_all(&ServerEvent::StudentLeft { id: conn.to_string() });
                info!(connection = %conn, name = participant.name.as_deref().unwrap_or(""), "student left");
            }
        }
    }

    pub fn teacher_join(&self, conn: &str) -> Result<(), JoinError> {
        let mut state = self.state.lock();
        let participant = state.registry.register(conn, Role::Teacher, None)?;
        state.connections.to_connection(conn, &ServerEvent::joined_success(&participant));

        // Catch-up roster: one student_joined per currently connected student.
        for student in state.registry.list_by_role(Role::Student) {
            state.connections.to_connection(
                conn,
                &ServerEvent::StudentJoined { participant: student.clone() },
            );
        }
        Self::replay_active_poll(&state, conn);
        info!(connection = %conn, "teacher joined");
        Ok(())
    }

    pub fn student_join(&self, conn: &str, name: &str) -> Result<(), JoinError> {
        let mut state = self.state.lock();
        let participant = state.registry.register(conn, Role::Student, Some(name))?;
        state.connections.to_connection(conn, &ServerEvent::joined_success(&participant));
        state.connections.to_role(
            &state.registry,
            Role::Teacher,
            &ServerEvent::StudentJoined { participant: participant.clone() },
        );
        Self::replay_active_poll(&state, conn);
        info!(connection = %conn, name = participant.name.as_deref().unwrap_or(""), "student joined");
        Ok(())
    }

    /// Open a new poll and arm its auto-end timer.
    pub fn create_poll(
        &self,
        conn: &str,
        question: &str,
        options: &[String],
        time_limit: Option<i64>,
    ) -> Result<(), PollError> {
        let (poll_id, secs, timer) = {
            let mut state = self.state.lock();
            if !state.registry.is_teacher(conn) {
                return Err(PollError::Unauthorized);
            }
            let created = state.machine.create(question, options, time_limit)?;
            let poll_id = created.snapshot.id.clone();
            let secs = created.snapshot.time_limit;
            info!(poll_id = %poll_id, time_limit = secs, "poll created");
            state.connections.to_all(&ServerEvent::PollCreated { poll: created.snapshot });
            (poll_id, secs, created.timer)
        };
        self.arm_timer(poll_id, secs, timer);
        Ok(())
    }

    fn arm_timer(&self, poll_id: String, secs: i64, timer: CancellationToken) {
        let Some(room) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs as u64)) => {
                    debug!(poll_id = %poll_id, "time limit reached");
                    room.end_poll(EndReason::TimedOut);
                }
            }
        });
    }

    /// Record a student's answer and broadcast the updated snapshot.
    pub fn submit_answer(
        &self,
        conn: &str,
        poll_id: &str,
        answer: &str,
    ) -> Result<(), PollError> {
        let mut state = self.state.lock();
        // Poll existence is checked before the caller's role.
        state.machine.ensure_accepting(poll_id)?;
        let user = match state.registry.lookup(conn) {
            Some(p) if p.role == Role::Student => AnswerUser {
                name: p.name.clone().unwrap_or_default(),
                role: p.role,
            },
            _ => return Err(PollError::Unauthorized),
        };
        let update = state.machine.submit(conn, poll_id, answer, user)?;
        debug!(connection = %conn, poll_id = %poll_id, answer = %answer, "answer recorded");
        state.connections.to_all(&ServerEvent::PollUpdated {
            poll_id: update.poll_id,
            results: update.results,
        });
        Ok(())
    }

    /// Manual end requested over a connection. Requests from non-teachers
    /// are silently ignored, not answered with an error.
    pub fn end_poll_command(&self, conn: &str) {
        let mut state = self.state.lock();
        if !state.registry.is_teacher(conn) {
            return;
        }
        Self::finish(&mut state, &self.history, EndReason::Manual);
    }

    /// End the active poll regardless of who asked (the timer path). A no-op
    /// when the slot is already empty, so racing ends are harmless.
    pub fn end_poll(&self, reason: EndReason) {
        let mut state = self.state.lock();
        Self::finish(&mut state, &self.history, reason);
    }

    fn finish(state: &mut RoomState, history: &Arc<dyn HistoryStore>, reason: EndReason) {
        let Some(finished) = state.machine.end(reason) else {
            return;
        };
        if let Err(err) = history.append(&finished.record()) {
            warn!(error = %err, "failed to append poll to history");
        }
        state.connections.to_all(&ServerEvent::PollEnded {
            poll_id: finished.poll.id.clone(),
            final_results: finished.results,
        });
    }

    /// Kick `target` off the room. Only teachers may kick; anyone else is
    /// silently ignored. The target's recorded answer, if any, stays counted.
    pub fn kick_student(&self, conn: &str, target: &str) {
        let mut state = self.state.lock();
        if !state.registry.is_teacher(conn) {
            return;
        }
        state.connections.to_connection(target, &ServerEvent::Kicked);
        state.registry.unregister(target);
        state.connections.to_all(&ServerEvent::StudentLeft { id: target.to_string() });
        // Dropping the sender ends the target's writer and closes its socket.
        state.connections.remove(target);
        info!(connection = %target, by = %conn, "student kicked");
    }

    /// Report a failed command to exactly the offending connection.
    pub fn send_error(&self, conn: &str, message: &str) {
        let state = self.state.lock();
        state.connections.to_connection(conn, &ServerEvent::error(message));
    }

    fn replay_active_poll(state: &RoomState, conn: &str) {
        if let Some((snapshot, results)) = state.machine.snapshot() {
            let poll_id = snapshot.id.clone();
            state.connections.to_connection(conn, &ServerEvent::PollCreated { poll: snapshot });
            state
                .connections
                .to_connection(conn, &ServerEvent::PollUpdated { poll_id, results });
        }
    }

    /// Number of attached sockets (joined or not).
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Whether a poll is currently accepting answers.
    pub fn has_active_poll(&self) -> bool {
        self.state.lock().machine.is_active()
    }
}
