//! Route configuration.

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    account_routes, admin_routes, contract_routes, health_routes, maintenance_routes,
    notification_routes, offer_routes, request_routes, session_routes, wallet_routes,
};
use crate::middleware::auth_middleware;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/accounts", account_routes())
        .nest("/wallet", wallet_routes())
        .nest("/requests", request_routes())
        .nest("/offers", offer_routes())
        .nest("/contracts", contract_routes())
        .nest("/notifications", notification_routes())
        .nest("/maintenance", maintenance_routes())
        .nest("/admin", admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Health check (no auth)
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Session start is the only public write
        .nest("/sessions", session_routes())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
