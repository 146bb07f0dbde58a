//! Moderation handlers (admin only; enforced by the services).

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{Contract, User};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BanRequest {
    pub banned: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyRequest {
    pub verified: bool,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/ban", post(set_banned))
        .route("/users/:id/verify", post(set_verified))
        .route("/contracts/:id/verify", post(verify_contract))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Every account", body = Vec<User>),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.market.accounts.list_users(current_user.id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/users/{id}/ban",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = BanRequest,
    responses(
        (status = 200, description = "Ban status changed", body = User),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn set_banned(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<BanRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .market
        .accounts
        .set_banned(current_user.id, id, payload.banned)
        .await?;

    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/admin/users/{id}/verify",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification badge changed", body = User),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn set_verified(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<VerifyRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .market
        .accounts
        .set_verified(current_user.id, id, payload.verified)
        .await?;

    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/admin/contracts/{id}/verify",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract verified", body = Contract),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn verify_contract(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    let contract = state
        .market
        .contracts
        .admin_verify_contract(current_user.id, id)
        .await?;

    Ok(Json(contract))
}
