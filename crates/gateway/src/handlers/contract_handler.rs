//! Contract, escrow and review handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{Contract, ContractType, Review};
use marketplace_lib::service::ReleaseReceipt;

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftContractBody {
    pub contract_type: ContractType,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContentBody {
    #[validate(length(min = 1, message = "Contract content cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewBody {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    #[schema(example = 5)]
    pub rating: u8,
}

/// Outcome of an escrow release
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub contract_id: Uuid,
    pub credited_amount: u64,
    pub new_engineer_balance: u64,
}

impl From<ReleaseReceipt> for ReleaseResponse {
    fn from(receipt: ReleaseReceipt) -> Self {
        Self {
            contract_id: receipt.contract_id,
            credited_amount: receipt.credited_amount,
            new_engineer_balance: receipt.new_engineer_balance,
        }
    }
}

/// Drafting lives under the offer it is drafted from
pub fn offer_routes() -> Router<AppState> {
    Router::new().route("/:id/contract", post(draft_contract))
}

pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts))
        .route("/:id", get(get_contract))
        .route("/:id/content", put(update_content))
        .route("/:id/sign", post(sign_contract))
        .route("/:id/release", post(release_funds))
        .route("/:id/review", post(submit_review))
}

#[utoipa::path(
    post,
    path = "/offers/{id}/contract",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Offer ID")),
    request_body = DraftContractBody,
    responses(
        (status = 201, description = "Contract drafted", body = Contract),
        (status = 403, description = "Not the request owner"),
        (status = 409, description = "Offer already has a contract")
    )
)]
pub async fn draft_contract(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<DraftContractBody>,
) -> AppResult<(StatusCode, Json<Contract>)> {
    let contract = state
        .market
        .contracts
        .draft_contract(current_user.id, offer_id, payload.contract_type)
        .await?;

    Ok((StatusCode::CREATED, Json(contract)))
}

/// Contracts the caller is party to; every contract for admins
#[utoipa::path(
    get,
    path = "/contracts",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Contracts, newest first", body = Vec<Contract>))
)]
pub async fn list_contracts(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Contract>>> {
    Ok(Json(state.market.contracts.list_for_user(current_user.id).await?))
}

#[utoipa::path(
    get,
    path = "/contracts/{id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract", body = Contract),
        (status = 404, description = "Contract not found")
    )
)]
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    Ok(Json(state.market.contracts.get(id).await?))
}

/// Rewrite the terms while nobody has signed
#[utoipa::path(
    put,
    path = "/contracts/{id}/content",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = ContentBody,
    responses(
        (status = 200, description = "Content updated", body = Contract),
        (status = 409, description = "Contract already signed")
    )
)]
pub async fn update_content(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ContentBody>,
) -> AppResult<Json<Contract>> {
    let contract = state
        .market
        .contracts
        .update_content(current_user.id, id, &payload.content)
        .await?;

    Ok(Json(contract))
}

#[utoipa::path(
    post,
    path = "/contracts/{id}/sign",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Signature recorded", body = Contract),
        (status = 403, description = "Not a party to the contract"),
        (status = 409, description = "Already signed")
    )
)]
pub async fn sign_contract(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    Ok(Json(state.market.contracts.sign(current_user.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/contracts/{id}/release",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Escrow released", body = ReleaseResponse),
        (status = 403, description = "Only the company or an admin can release"),
        (status = 409, description = "Not fully signed or already released")
    )
)]
pub async fn release_funds(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReleaseResponse>> {
    let receipt = state
        .market
        .contracts
        .release_funds(current_user.id, id)
        .await?;

    Ok(Json(receipt.into()))
}

#[utoipa::path(
    post,
    path = "/contracts/{id}/review",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = ReviewBody,
    responses(
        (status = 201, description = "Review stored", body = Review),
        (status = 409, description = "Contract already reviewed or not released")
    )
)]
pub async fn submit_review(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ReviewBody>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state
        .market
        .reviews
        .submit_review(current_user.id, id, payload.rating)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}
