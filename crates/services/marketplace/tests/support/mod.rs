//! Shared fixtures for the marketplace integration tests.

#![allow(dead_code)]

use common::MarketplaceConfig;
use domain::{Contract, ContractType, NewOffer, NewRequest, Offer, Password, Request, User, UserType};
use marketplace_lib::service::{AdminCredentials, Marketplace};

pub const ADMIN_EMAIL: &str = "ops@repairhub.example";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub fn admin_credentials() -> AdminCredentials {
    AdminCredentials::new().with(ADMIN_EMAIL, Password::new(ADMIN_PASSWORD).unwrap())
}

pub fn marketplace() -> Marketplace {
    Marketplace::in_memory(MarketplaceConfig::default(), admin_credentials())
}

pub async fn register(market: &Marketplace, email: &str, name: &str, user_type: UserType) -> User {
    let session = market.accounts.start_session().await.unwrap();
    market
        .accounts
        .register(session.id, email, name, user_type)
        .await
        .unwrap()
}

pub async fn company(market: &Marketplace) -> User {
    register(market, "plant@acme.example", "Acme Manufacturing", UserType::Company).await
}

pub async fn engineer(market: &Marketplace) -> User {
    register(market, "eve@fixers.example", "Eve Fixer", UserType::Engineer).await
}

pub async fn admin(market: &Marketplace) -> User {
    let session = market.accounts.start_session().await.unwrap();
    market
        .accounts
        .elevate_to_admin(session.id, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap()
}

pub fn lathe_request(budget: u64) -> NewRequest {
    NewRequest {
        machine: "CNC Lathe X200".to_string(),
        machine_type: "CNC Machine".to_string(),
        issue: "Spindle bearing grinding under load".to_string(),
        budget,
        location: "Detroit Plant 2".to_string(),
    }
}

pub fn offer(price: u64) -> NewOffer {
    NewOffer {
        price,
        description: "Replace spindle bearings and realign".to_string(),
        timeline: "2 days".to_string(),
        start_date: None,
    }
}

/// A request with one offer on it
pub async fn offered(market: &Marketplace, company: &User, engineer: &User, price: u64) -> (Request, Offer) {
    let request = market
        .requests
        .create_request(company.id, lathe_request(500))
        .await
        .unwrap();
    let offer = market
        .offers
        .create_offer(engineer.id, request.id, offer(price))
        .await
        .unwrap();
    (request, offer)
}

/// A drafted contract signed by both parties
pub async fn signed_contract(market: &Marketplace, company: &User, engineer: &User, price: u64) -> Contract {
    let (_, offer) = offered(market, company, engineer, price).await;
    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();
    market.contracts.sign(company.id, contract.id).await.unwrap();
    market.contracts.sign(engineer.id, contract.id).await.unwrap()
}
