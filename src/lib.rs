//! pollroom
//!
//! A real-time classroom polling server: a teacher opens one timed
//! question at a time, students answer over WebSocket connections, and
//! every participant watches the tally update live. Finished polls are
//! appended to a durable history readable over a small REST surface.

pub mod cli;
pub mod config;
pub mod history;
pub mod logging;
pub mod poll;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod server;
