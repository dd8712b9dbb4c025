//! Irori chat client library.
//!
//! Connects to the chat server over WebSocket, prints the history and live
//! messages, and sends lines typed by the user. Reconnects on transient
//! failures.

mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use error::ClientError;
pub use runner::run_client;
pub use session::{Connection, connect_session, run_session};
pub use ui::spawn_input_thread;
