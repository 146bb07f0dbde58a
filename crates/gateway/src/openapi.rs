//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use domain::{
    AccountStatus, Contract, ContractStatus, ContractType, Features, Notification,
    NotificationKind, Offer, OfferStatus, Priority, Request, RequestStatus, Review,
    SubscriptionTier, User, UserType,
};

use crate::handlers::account_handler::{
    AdminLoginRequest, BalanceResponse, RatingResponse, RegisterRequest, SessionResponse,
    SubscriptionRequest, TopUpRequest,
};
use crate::handlers::admin_handler::{BanRequest, VerifyRequest};
use crate::handlers::contract_handler::{ContentBody, DraftContractBody, ReleaseResponse, ReviewBody};
use crate::handlers::health_handler::{HealthResponse, ServiceHealth};
use crate::handlers::maintenance_handler::{DiagnosticsRequest, DiagnosticsResponse, SampleBody};
use crate::handlers::notification_handler::ClearedResponse;
use crate::handlers::request_handler::{CreateOfferBody, CreateRequestBody};
use crate::session::TokenResponse;

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_handler::health_check,
        crate::handlers::account_handler::start_session,
        crate::handlers::account_handler::register,
        crate::handlers::account_handler::elevate_to_admin,
        crate::handlers::account_handler::get_current_user,
        crate::handlers::account_handler::upgrade_subscription,
        crate::handlers::account_handler::engineer_rating,
        crate::handlers::account_handler::top_up,
        crate::handlers::request_handler::list_requests,
        crate::handlers::request_handler::create_request,
        crate::handlers::request_handler::smart_match,
        crate::handlers::request_handler::get_request,
        crate::handlers::request_handler::list_offers,
        crate::handlers::request_handler::create_offer,
        crate::handlers::contract_handler::draft_contract,
        crate::handlers::contract_handler::list_contracts,
        crate::handlers::contract_handler::get_contract,
        crate::handlers::contract_handler::update_content,
        crate::handlers::contract_handler::sign_contract,
        crate::handlers::contract_handler::release_funds,
        crate::handlers::contract_handler::submit_review,
        crate::handlers::notification_handler::list_notifications,
        crate::handlers::notification_handler::clear_notifications,
        crate::handlers::maintenance_handler::run_diagnostics,
        crate::handlers::admin_handler::list_users,
        crate::handlers::admin_handler::set_banned,
        crate::handlers::admin_handler::set_verified,
        crate::handlers::admin_handler::verify_contract,
    ),
    components(
        schemas(
            User,
            UserType,
            AccountStatus,
            SubscriptionTier,
            Features,
            Request,
            RequestStatus,
            Priority,
            Offer,
            OfferStatus,
            Contract,
            ContractStatus,
            ContractType,
            Notification,
            NotificationKind,
            Review,
            TokenResponse,
            SessionResponse,
            RegisterRequest,
            AdminLoginRequest,
            SubscriptionRequest,
            TopUpRequest,
            BalanceResponse,
            RatingResponse,
            CreateRequestBody,
            CreateOfferBody,
            DraftContractBody,
            ContentBody,
            ReviewBody,
            ReleaseResponse,
            ClearedResponse,
            SampleBody,
            DiagnosticsRequest,
            DiagnosticsResponse,
            BanRequest,
            VerifyRequest,
            HealthResponse,
            ServiceHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness of the gateway and its store"),
        (name = "Accounts", description = "Sessions, registration and profiles"),
        (name = "Wallet", description = "Wallet deposits"),
        (name = "Requests", description = "Maintenance requests and offers"),
        (name = "Contracts", description = "Contract signing, escrow release and reviews"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Maintenance", description = "Machine diagnostics"),
        (name = "Admin", description = "Moderation endpoints"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
