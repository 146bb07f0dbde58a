//! Session, account and wallet handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{SubscriptionTier, User, UserType};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::session::TokenResponse;
use crate::state::AppState;

/// Guest profile together with the token that identifies it
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: TokenResponse,
    pub user: User,
}

/// Account registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "plant@acme.example")]
    pub email: String,
    /// Company or engineer display name
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Acme Manufacturing")]
    pub name: String,
    /// `company` or `engineer`
    pub user_type: UserType,
}

/// Admin elevation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubscriptionRequest {
    pub tier: SubscriptionTier,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TopUpRequest {
    /// Whole currency units to deposit
    #[validate(range(min = 1, message = "Amount must be a positive number"))]
    #[schema(example = 250)]
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub engineer_id: Uuid,
    /// Mean of stored reviews, absent before the first one
    pub rating: Option<f64>,
}

/// Public session route
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/", post(start_session))
}

/// Account routes (auth required)
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/admin", post(elevate_to_admin))
        .route("/me", get(get_current_user))
        .route("/me/subscription", post(upgrade_subscription))
        .route("/:id/rating", get(engineer_rating))
}

/// Wallet routes (auth required)
pub fn wallet_routes() -> Router<AppState> {
    Router::new().route("/top-up", post(top_up))
}

/// Start an anonymous session
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "Accounts",
    responses(
        (status = 201, description = "Guest session started", body = SessionResponse)
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let user = state.market.accounts.start_session().await?;
    let token = state.sessions.issue(user.id)?;

    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

/// Turn the session profile into a company or engineer account
#[utoipa::path(
    post,
    path = "/accounts/register",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account registered", body = User),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .market
        .accounts
        .register(current_user.id, &payload.email, &payload.name, payload.user_type)
        .await?;

    Ok(Json(user))
}

/// Elevate the session profile with seeded admin credentials
#[utoipa::path(
    post,
    path = "/accounts/admin",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Session elevated", body = User),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn elevate_to_admin(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AdminLoginRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .market
        .accounts
        .elevate_to_admin(current_user.id, &payload.email, &payload.password)
        .await?;

    Ok(Json(user))
}

/// Get the session profile
#[utoipa::path(
    get,
    path = "/accounts/me",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current profile", body = User),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    Ok(Json(state.market.accounts.profile(current_user.id).await?))
}

#[utoipa::path(
    post,
    path = "/accounts/me/subscription",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    request_body = SubscriptionRequest,
    responses(
        (status = 200, description = "Plan upgraded", body = User),
        (status = 400, description = "Validation error")
    )
)]
pub async fn upgrade_subscription(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubscriptionRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .market
        .accounts
        .upgrade_subscription(current_user.id, payload.tier)
        .await?;

    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/accounts/{id}/rating",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Engineer ID")),
    responses((status = 200, description = "Average review rating", body = RatingResponse))
)]
pub async fn engineer_rating(
    State(state): State<AppState>,
    Path(engineer_id): Path<Uuid>,
) -> AppResult<Json<RatingResponse>> {
    let rating = state.market.reviews.engineer_rating(engineer_id).await?;

    Ok(Json(RatingResponse { engineer_id, rating }))
}

/// Simulated deposit into the caller's wallet
#[utoipa::path(
    post,
    path = "/wallet/top-up",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "New balance", body = BalanceResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn top_up(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TopUpRequest>,
) -> AppResult<Json<BalanceResponse>> {
    let balance = state
        .market
        .ledger
        .top_up(current_user.id, current_user.id, payload.amount)
        .await?;

    Ok(Json(BalanceResponse { balance }))
}
