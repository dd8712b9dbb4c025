//! Irori chat server library.
//!
//! Clients connect over WebSocket, announce a username, receive the persisted
//! chat history and then exchange broadcast messages with every other
//! connected client. Each message is written to the store before it is
//! broadcast.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
