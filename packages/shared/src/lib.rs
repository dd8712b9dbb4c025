//! Shared utilities for the Irori server and client.

pub mod logger;
pub mod time;
