//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared
//! resources like the session store and the turn conductor.

use crate::store::SessionStore;
use std::sync::Arc;
use study_partner_core::{conductor::Conductor, scenario::Scenario};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub conductor: Arc<Conductor>,
    pub scenario: Arc<Scenario>,
}
