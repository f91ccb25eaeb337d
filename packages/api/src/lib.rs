// ABOUTME: HTTP API layer for Sowkit providing REST endpoints and routing
// ABOUTME: Thin handlers over the proposals manager

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sowkit_proposals::ProposalsManager;
use std::sync::Arc;

pub mod proposals_handlers;
pub mod public_handlers;
pub mod response;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ProposalsManager>,
}

impl AppState {
    pub fn new(manager: Arc<ProposalsManager>) -> Self {
        Self { manager }
    }
}

/// Creates the owner-facing proposals API router
pub fn create_proposals_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(proposals_handlers::list_proposals))
        .route("/", post(proposals_handlers::create_proposal))
        .route("/{id}", get(proposals_handlers::get_proposal))
        .route("/{id}", put(proposals_handlers::update_proposal))
        .route("/{id}", delete(proposals_handlers::delete_proposal))
        .route("/{id}/send", post(proposals_handlers::send_proposal))
        .route("/{id}/status", post(proposals_handlers::set_status))
        .route(
            "/{id}/verification",
            get(proposals_handlers::get_verification),
        )
        .with_state(state)
}

/// Creates the router for account-level numbering configuration
pub fn create_prefix_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(proposals_handlers::set_prefix))
        .route("/{account_id}", get(proposals_handlers::get_prefix))
        .with_state(state)
}

/// Creates the recipient-facing public router, addressed by token
pub fn create_public_router(state: AppState) -> Router {
    Router::new()
        .route("/{token}", get(public_handlers::get_public_proposal))
        .route("/{token}/sign", post(public_handlers::sign_public_proposal))
        .with_state(state)
}

/// Assembles the full application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/proposals", create_proposals_router(state.clone()))
        .nest("/api/sow-prefix", create_prefix_router(state.clone()))
        .nest("/p", create_public_router(state))
}
