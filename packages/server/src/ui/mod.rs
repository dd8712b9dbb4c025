//! WebSocket chat server implementation.

pub mod close_code;
mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use error::ServerError;
pub use server::{BoundServer, Server};
pub use signal::shutdown_signal;
