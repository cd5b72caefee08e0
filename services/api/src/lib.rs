//! Study Partner API Library Crate
//!
//! This library contains the web service around the discussion controller:
//! the application state, the in-memory session store, API handlers, WebSocket
//! logic, and routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
pub mod ws;
