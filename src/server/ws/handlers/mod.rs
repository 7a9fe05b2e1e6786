//! Command handlers
//!
//! Maps each inbound command onto the room. Validation failures are
//! reported to the offending connection only; `end_poll` and `kick_student`
//! from non-teachers are silently ignored rather than answered.

use tracing::debug;

use crate::protocol::ClientCommand;
use crate::room::Room;

pub fn dispatch(room: &Room, conn: &str, raw: &str) {
    let command = match serde_json::from_str::<ClientCommand>(raw) {
        Ok(command) => command,
        Err(err) => {
            debug!(connection = %conn, error = %err, "unparseable command");
            room.send_error(conn, "Invalid message format");
            return;
        }
    };

    match command {
        ClientCommand::TeacherJoin => {
            if let Err(err) = room.teacher_join(conn) {
                room.send_error(conn, &err.to_string());
            }
        }
        ClientCommand::StudentJoin { name } => {
            if let Err(err) = room.student_join(conn, &name) {
                room.send_error(conn, &err.to_string());
            }
        }
        ClientCommand::CreatePoll { question, options, time_limit } => {
            if let Err(err) = room.create_poll(conn, &question, &options, time_limit) {
                room.send_error(conn, &err.to_string());
            }
        }
        ClientCommand::SubmitAnswer { poll_id, answer } => {
            if let Err(err) = room.submit_answer(conn, &poll_id, &answer) {
                room.send_error(conn, &err.to_string());
            }
        }
        ClientCommand::EndPoll => room.end_poll_command(conn),
        ClientCommand::KickStudent { student_id } => room.kick_student(conn, &student_id),
    }
}
