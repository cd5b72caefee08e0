//! WebSocket Session Management
//!
//! This module contains the logic for driving a discussion in real time over
//! WebSockets. It is structured into submodules:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Manages the WebSocket connection lifecycle, from handshake to termination.
//! - `cycle`: Runs one user turn through the conductor and streams the reply back.

mod cycle;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
