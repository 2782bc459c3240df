//! API handlers for the circulation desk endpoints

pub mod desk;
pub mod health;
pub mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Circulation desk
        .route("/desk/sessions", post(desk::open_session))
        .route("/desk/sessions/:id", get(desk::get_session))
        .route("/desk/sessions/:id/scan", post(desk::scan))
        .route("/desk/sessions/:id/items/:item_pid/action", put(desk::set_action))
        .route("/desk/sessions/:id/apply", post(desk::apply))
        .route("/desk/sessions/:id/exit", post(desk::exit))
        // Request validation
        .route("/validation/sessions", post(validation::open_session))
        .route(
            "/validation/sessions/:id",
            get(validation::get_session).delete(validation::close_session),
        )
        .route("/validation/sessions/:id/validate", post(validation::validate))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
