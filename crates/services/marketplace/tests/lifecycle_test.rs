//! Offer -> contract -> escrow lifecycle tests over the in-memory store.

mod support;

use futures::future::join_all;

use common::AppError;
use domain::{ContractPhase, ContractStatus, ContractType, RequestStatus, UserType};

use support::*;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle_pays_engineer_once() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;

    let request = market
        .requests
        .create_request(company.id, lathe_request(500))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Active);
    assert_eq!(request.company_name, "Acme Manufacturing");

    let offer = market
        .offers
        .create_offer(engineer.id, request.id, offer(400))
        .await
        .unwrap();
    assert_eq!(offer.engineer_name, "Eve Fixer");

    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();
    assert_eq!(contract.title, "Standard Contract");
    assert_eq!(
        contract.content,
        "Scope of Work: Replace spindle bearings and realign\n\nStandard terms apply. Payment held in escrow."
    );
    assert_eq!(contract.price, 400);
    assert_eq!(contract.phase(), ContractPhase::Editable);

    let contract = market.contracts.sign(company.id, contract.id).await.unwrap();
    assert!(contract.company_signed);
    assert!(!contract.engineer_signed);

    let contract = market.contracts.sign(engineer.id, contract.id).await.unwrap();
    assert_eq!(contract.phase(), ContractPhase::FullySigned);

    let receipt = market
        .contracts
        .release_funds(company.id, contract.id)
        .await
        .unwrap();
    assert_eq!(receipt.credited_amount, 400);
    assert_eq!(receipt.new_engineer_balance, 400);

    let contract = market.contracts.get(contract.id).await.unwrap();
    assert!(contract.released);
    assert!(contract.paid);
    assert_eq!(contract.status, ContractStatus::Completed);

    let request = market.requests.get(request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert_eq!(market.accounts.profile(engineer.id).await.unwrap().balance, 400);

    let second = market.contracts.release_funds(company.id, contract.id).await;
    assert!(matches!(second, Err(AppError::AlreadyReleased)));
    assert_eq!(market.accounts.profile(engineer.id).await.unwrap().balance, 400);
}

#[tokio::test]
async fn test_lifecycle_notifies_both_parties() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;

    let contract = signed_contract(&market, &company, &engineer, 400).await;
    market
        .contracts
        .release_funds(company.id, contract.id)
        .await
        .unwrap();

    let company_inbox: Vec<String> = market
        .notifications
        .list_for(company.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.message)
        .collect();
    let engineer_inbox: Vec<String> = market
        .notifications
        .list_for(engineer.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.message)
        .collect();

    assert!(company_inbox.contains(&"New offer received from Eve Fixer for CNC Lathe X200".to_string()));
    assert!(company_inbox.contains(&"Eve Fixer has signed the contract for Standard Contract.".to_string()));
    assert!(company_inbox.contains(&"Job marked complete. Funds released to engineer.".to_string()));
    assert!(engineer_inbox.contains(&"Contract drafted for CNC Lathe X200. Please review and sign.".to_string()));
    assert!(engineer_inbox.contains(&"Acme Manufacturing has signed the contract for Standard Contract.".to_string()));
    assert!(engineer_inbox.contains(&"Escrow released! $400 added to your wallet.".to_string()));
}

// =============================================================================
// Contracts
// =============================================================================

#[tokio::test]
async fn test_two_offers_yield_two_contracts() {
    let market = marketplace();
    let company = company(&market).await;
    let eve = engineer(&market).await;
    let sam = register(&market, "sam@fixers.example", "Sam", UserType::Engineer).await;

    let (request, first) = offered(&market, &company, &eve, 400).await;
    let second = market
        .offers
        .create_offer(sam.id, request.id, offer(350))
        .await
        .unwrap();

    let a = market
        .contracts
        .draft_contract(company.id, first.id, ContractType::Standard)
        .await
        .unwrap();
    let b = market
        .contracts
        .draft_contract(company.id, second.id, ContractType::Warranty)
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(b.title, "Warranty Contract");
    assert_eq!(market.contracts.list_for_user(company.id).await.unwrap().len(), 2);
    assert_eq!(market.contracts.list_for_user(sam.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_draft_for_same_offer_conflicts() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let (_, offer) = offered(&market, &company, &engineer, 400).await;

    market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();
    let again = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Emergency)
        .await;

    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_drafts_create_one_contract() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let (_, offer) = offered(&market, &company, &engineer, 400).await;

    let attempts = (0..8).map(|_| {
        let market = market.clone();
        let company_id = company.id;
        let offer_id = offer.id;
        tokio::spawn(async move {
            market
                .contracts
                .draft_contract(company_id, offer_id, ContractType::Standard)
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::Conflict(_))));
    assert_eq!(market.contracts.list_for_user(company.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_request_owner_drafts() {
    let market = marketplace();
    let owner = company(&market).await;
    let rival = register(&market, "ops@rival.example", "Rival Corp", UserType::Company).await;
    let engineer = engineer(&market).await;
    let (_, offer) = offered(&market, &owner, &engineer, 400).await;

    let result = market
        .contracts
        .draft_contract(rival.id, offer.id, ContractType::Standard)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = market
        .contracts
        .draft_contract(engineer.id, offer.id, ContractType::Standard)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_content_freezes_after_first_signature() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let (_, offer) = offered(&market, &company, &engineer, 400).await;
    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();

    let edited = market
        .contracts
        .update_content(engineer.id, contract.id, "Scope of Work: bearings and belts")
        .await
        .unwrap();
    assert_eq!(edited.content, "Scope of Work: bearings and belts");

    market.contracts.sign(company.id, contract.id).await.unwrap();

    let frozen = market
        .contracts
        .update_content(company.id, contract.id, "Scope of Work: everything")
        .await;
    assert!(matches!(frozen, Err(AppError::InvalidTransition(_))));
    assert_eq!(
        market.contracts.get(contract.id).await.unwrap().content,
        "Scope of Work: bearings and belts"
    );
}

#[tokio::test]
async fn test_party_signs_only_own_flag_once() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let stranger = register(&market, "sam@fixers.example", "Sam", UserType::Engineer).await;
    let (_, offer) = offered(&market, &company, &engineer, 400).await;
    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();

    let signed = market.contracts.sign(engineer.id, contract.id).await.unwrap();
    assert!(signed.engineer_signed);
    assert!(!signed.company_signed);

    let twice = market.contracts.sign(engineer.id, contract.id).await;
    match twice {
        Err(AppError::Conflict(reason)) => assert_eq!(reason, "Contract already signed by the engineer"),
        other => panic!("expected conflict, got {:?}", other),
    }

    let outsider = market.contracts.sign(stranger.id, contract.id).await;
    assert!(matches!(outsider, Err(AppError::Forbidden(_))));
}

// =============================================================================
// Escrow release
// =============================================================================

#[tokio::test]
async fn test_release_requires_both_signatures() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let (_, offer) = offered(&market, &company, &engineer, 400).await;
    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Standard)
        .await
        .unwrap();
    market.contracts.sign(company.id, contract.id).await.unwrap();

    let early = market.contracts.release_funds(company.id, contract.id).await;

    assert!(matches!(early, Err(AppError::InvalidTransition(_))));
    assert_eq!(market.accounts.profile(engineer.id).await.unwrap().balance, 0);
}

#[tokio::test]
async fn test_admin_can_force_release_unsigned_contract() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let admin = admin(&market).await;
    let (_, offer) = offered(&market, &company, &engineer, 250).await;
    let contract = market
        .contracts
        .draft_contract(company.id, offer.id, ContractType::Emergency)
        .await
        .unwrap();

    let receipt = market
        .contracts
        .release_funds(admin.id, contract.id)
        .await
        .unwrap();

    assert_eq!(receipt.new_engineer_balance, 250);
}

#[tokio::test]
async fn test_engineer_cannot_release() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let contract = signed_contract(&market, &company, &engineer, 400).await;

    let result = market.contracts.release_funds(engineer.id, contract.id).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(!market.contracts.get(contract.id).await.unwrap().released);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_releases_credit_once() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let contract = signed_contract(&market, &company, &engineer, 400).await;

    let attempts = (0..6).map(|_| {
        let market = market.clone();
        let company_id = company.id;
        let contract_id = contract.id;
        tokio::spawn(async move { market.contracts.release_funds(company_id, contract_id).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::AlreadyReleased)));
    assert_eq!(market.accounts.profile(engineer.id).await.unwrap().balance, 400);
}

#[tokio::test]
async fn test_completed_request_rejects_offers() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let contract = signed_contract(&market, &company, &engineer, 400).await;
    market
        .contracts
        .release_funds(company.id, contract.id)
        .await
        .unwrap();

    let late = market
        .offers
        .create_offer(engineer.id, contract.request_id, offer(300))
        .await;

    assert!(matches!(late, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_admin_verifies_contract() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;
    let admin = admin(&market).await;
    let contract = signed_contract(&market, &company, &engineer, 400).await;

    let denied = market.contracts.admin_verify_contract(company.id, contract.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let verified = market
        .contracts
        .admin_verify_contract(admin.id, contract.id)
        .await
        .unwrap();
    assert!(verified.admin_verified);
    assert_eq!(market.contracts.list_for_user(admin.id).await.unwrap().len(), 1);
}

// =============================================================================
// Requests and offers
// =============================================================================

#[tokio::test]
async fn test_engineer_cannot_post_request() {
    let market = marketplace();
    let engineer = engineer(&market).await;

    let result = market
        .requests
        .create_request(engineer.id, lathe_request(500))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_offers_listed_newest_first() {
    let market = marketplace();
    let company = company(&market).await;
    let eve = engineer(&market).await;
    let sam = register(&market, "sam@fixers.example", "Sam", UserType::Engineer).await;

    let (request, first) = offered(&market, &company, &eve, 400).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = market
        .offers
        .create_offer(sam.id, request.id, offer(380))
        .await
        .unwrap();

    let offers = market.offers.list_for_request(request.id).await.unwrap();
    let ids: Vec<_> = offers.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_smart_match_skips_completed_requests() {
    let market = marketplace();
    let company = company(&market).await;
    let engineer = engineer(&market).await;

    let contract = signed_contract(&market, &company, &engineer, 400).await;
    market
        .contracts
        .release_funds(company.id, contract.id)
        .await
        .unwrap();
    let open = market
        .requests
        .create_request(company.id, lathe_request(800))
        .await
        .unwrap();

    let matches = market.requests.smart_match(engineer.id).await.unwrap();
    let ids: Vec<_> = matches.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![open.id]);
}
