//! Request and offer handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{NewOffer, NewRequest, Offer, Request, RequestFilter};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Request posting body
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    #[validate(length(min = 1, message = "Machine is required"))]
    #[schema(example = "CNC Lathe X200")]
    pub machine: String,
    #[serde(default)]
    #[schema(example = "CNC Machine")]
    pub machine_type: String,
    #[validate(length(min = 1, message = "Issue description is required"))]
    #[schema(example = "Spindle bearing grinding under load")]
    pub issue: String,
    #[schema(example = 500)]
    pub budget: u64,
    #[serde(default)]
    pub location: String,
}

impl From<CreateRequestBody> for NewRequest {
    fn from(body: CreateRequestBody) -> Self {
        NewRequest {
            machine: body.machine,
            machine_type: body.machine_type,
            issue: body.issue,
            budget: body.budget,
            location: body.location,
        }
    }
}

/// Offer body
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferBody {
    #[validate(range(min = 1, message = "Price must be greater than zero"))]
    #[schema(example = 400)]
    pub price: u64,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    #[schema(example = "2 days")]
    pub timeline: String,
    #[serde(default)]
    pub start_date: Option<String>,
}

impl From<CreateOfferBody> for NewOffer {
    fn from(body: CreateOfferBody) -> Self {
        NewOffer {
            price: body.price,
            description: body.description,
            timeline: body.timeline,
            start_date: body.start_date,
        }
    }
}

/// Request routes (auth required)
pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/matches", get(smart_match))
        .route("/:id", get(get_request))
        .route("/:id/offers", get(list_offers).post(create_offer))
}

/// Browse requests, newest first
#[utoipa::path(
    get,
    path = "/requests",
    tag = "Requests",
    security(("bearer_auth" = [])),
    params(
        ("machineType" = Option<String>, Query, description = "Substring of the machine type"),
        ("location" = Option<String>, Query, description = "Substring of the location"),
        ("budgetMin" = Option<u64>, Query, description = "Lowest budget"),
        ("budgetMax" = Option<u64>, Query, description = "Highest budget")
    ),
    responses((status = 200, description = "Matching requests", body = Vec<Request>))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> AppResult<Json<Vec<Request>>> {
    Ok(Json(state.market.requests.filter(&filter).await?))
}

#[utoipa::path(
    post,
    path = "/requests",
    tag = "Requests",
    security(("bearer_auth" = [])),
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request posted", body = Request),
        (status = 403, description = "Only companies can post requests")
    )
)]
pub async fn create_request(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateRequestBody>,
) -> AppResult<(StatusCode, Json<Request>)> {
    let request = state
        .market
        .requests
        .create_request(current_user.id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// Open requests matching the caller's specialties
#[utoipa::path(
    get,
    path = "/requests/matches",
    tag = "Requests",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Matched requests", body = Vec<Request>))
)]
pub async fn smart_match(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Request>>> {
    Ok(Json(state.market.requests.smart_match(current_user.id).await?))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "Requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request", body = Request),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Request>> {
    Ok(Json(state.market.requests.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/requests/{id}/offers",
    tag = "Requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Offers, newest first", body = Vec<Offer>),
        (status = 404, description = "Request not found")
    )
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Offer>>> {
    Ok(Json(state.market.offers.list_for_request(id).await?))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/offers",
    tag = "Requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = CreateOfferBody,
    responses(
        (status = 201, description = "Offer submitted", body = Offer),
        (status = 403, description = "Only engineers can submit offers"),
        (status = 409, description = "Request already completed")
    )
)]
pub async fn create_offer(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateOfferBody>,
) -> AppResult<(StatusCode, Json<Offer>)> {
    let offer = state
        .market
        .offers
        .create_offer(current_user.id, id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(offer)))
}
