//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, Message, MessageRole, ScenarioResponse, Session, SessionDetail,
        SessionStatus,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_scenario,
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
    ),
    components(
        schemas(ScenarioResponse, Session, SessionDetail, Message, ErrorResponse, SessionStatus, MessageRole)
    ),
    tags(
        (name = "Study Partner API", description = "Case discussions with a study partner")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/scenario", get(handlers::get_scenario))
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    // Swagger UI is stateless, so it is merged outside the stateful group.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.contains(&&"/scenario".to_string()));
        assert!(paths.contains(&&"/sessions".to_string()));
        assert!(paths.contains(&&"/sessions/{id}".to_string()));
    }
}
