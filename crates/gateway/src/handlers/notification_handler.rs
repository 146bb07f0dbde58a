//! Notification handlers.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use common::AppResult;
use domain::Notification;

use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedResponse {
    pub cleared: usize,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/", get(list_notifications).delete(clear_notifications))
}

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Notifications", body = Vec<Notification>))
)]
pub async fn list_notifications(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.market.notifications.list_for(current_user.id).await?))
}

#[utoipa::path(
    delete,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Number of notifications removed", body = ClearedResponse))
)]
pub async fn clear_notifications(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<ClearedResponse>> {
    let cleared = state.market.notifications.clear_all(current_user.id).await?;
    Ok(Json(ClearedResponse { cleared }))
}
