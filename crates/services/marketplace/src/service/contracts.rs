//! Contract store - drafting, signing and escrow release.
//!
//! Every transition re-reads the contract and commits against the version it
//! read. A concurrent writer makes the commit fail with `StaleWrite`; the
//! operation then retries and re-evaluates its preconditions on fresh state,
//! so a second release sees `released` and fails with `AlreadyReleased`.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use common::{AppError, AppResult, MarketplaceConfig};
use domain::{
    authorize, Action, Contract, ContractType, NotificationKind, Offer, Party, Request, User,
};

use crate::infra::DocumentStore;
use crate::repository::Records;
use crate::service::ledger::Ledger;
use crate::service::notifications::NotificationService;
use crate::service::retry::retry_stale;

const OFFER_ALREADY_CONTRACTED: &str = "Offer already has a contract";

/// Outcome of a successful escrow release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseReceipt {
    pub contract_id: Uuid,
    pub credited_amount: u64,
    pub new_engineer_balance: u64,
}

pub struct ContractService {
    store: Arc<dyn DocumentStore>,
    contracts: Records<Contract>,
    offers: Records<Offer>,
    requests: Records<Request>,
    users: Records<User>,
    notifications: Arc<NotificationService>,
    max_write_attempts: u32,
}

impl ContractService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifications: Arc<NotificationService>,
        config: &MarketplaceConfig,
    ) -> Self {
        Self {
            contracts: Records::new(store.clone()),
            offers: Records::new(store.clone()),
            requests: Records::new(store.clone()),
            users: Records::new(store.clone()),
            store,
            notifications,
            max_write_attempts: config.max_write_attempts,
        }
    }

    /// Draft the single contract for an offer on one of the actor's requests.
    pub async fn draft_contract(
        &self,
        actor_id: Uuid,
        offer_id: Uuid,
        contract_type: ContractType,
    ) -> AppResult<Contract> {
        let actor = self.users.require(actor_id).await?;
        let offer = self.offers.require(offer_id).await?;
        let request = self.requests.require(offer.request_id).await?;
        authorize(&actor, &Action::DraftContract { request: &request })?;

        if self.contracts.find(Contract::id_for_offer(offer.id)).await?.is_some() {
            return Err(AppError::conflict(OFFER_ALREADY_CONTRACTED));
        }

        let contract = Contract::draft(&offer, &request, contract_type)?;
        // The id is derived from the offer, so a concurrent draft collides here
        match self.contracts.insert(&contract).await {
            Err(AppError::Conflict(_)) => return Err(AppError::conflict(OFFER_ALREADY_CONTRACTED)),
            other => other?,
        }

        tracing::info!(
            contract_id = %contract.id,
            offer_id = %offer.id,
            company_id = %actor_id,
            "Contract drafted"
        );

        self.notifications
            .notify(
                contract.engineer_id,
                format!("Contract drafted for {}. Please review and sign.", request.machine),
                NotificationKind::Info,
                Some(request.id),
            )
            .await;

        Ok(contract)
    }

    /// Rewrite the content while neither party has signed
    pub async fn update_content(
        &self,
        actor_id: Uuid,
        contract_id: Uuid,
        content: &str,
    ) -> AppResult<Contract> {
        let contract = retry_stale("update_contract_content", self.max_write_attempts, || {
            let content = content.to_string();
            async move {
                let actor = self.users.require(actor_id).await?;
                let mut contract = self.contracts.require(contract_id).await?;
                authorize(&actor, &Action::EditContract { contract: &contract })?;

                contract.rewrite(content)?;
                self.contracts.update(&contract).await?;
                Ok(contract.into_inner())
            }
        })
        .await?;

        tracing::info!(contract_id = %contract_id, editor_id = %actor_id, "Contract content updated");
        Ok(contract)
    }

    /// Set the actor's own signature flag and tell the other party
    pub async fn sign(&self, actor_id: Uuid, contract_id: Uuid) -> AppResult<Contract> {
        let (contract, party, signer) = retry_stale("sign_contract", self.max_write_attempts, || async move {
            let actor = self.users.require(actor_id).await?;
            let mut contract = self.contracts.require(contract_id).await?;
            authorize(&actor, &Action::SignContract { contract: &contract })?;

            let party = Party::for_user_type(actor.user_type)
                .ok_or_else(|| AppError::forbidden("only contract parties can sign"))?;
            contract.sign(party)?;
            self.contracts.update(&contract).await?;
            Ok((contract.into_inner(), party, actor.into_inner().name))
        })
        .await?;

        tracing::info!(
            contract_id = %contract.id,
            party = %party,
            fully_signed = contract.is_fully_signed(),
            "Contract signed"
        );

        self.notifications
            .notify(
                contract.counterpart(party),
                format!("{} has signed the contract for {}.", signer, contract.title),
                NotificationKind::Info,
                Some(contract.request_id),
            )
            .await;

        Ok(contract)
    }

    /// Pay the contract price to the engineer and close the contract and its request.
    ///
    /// The contract, the engineer's wallet and the request are written in one
    /// batch against the versions read, so concurrent releases credit once.
    pub async fn release_funds(&self, actor_id: Uuid, contract_id: Uuid) -> AppResult<ReleaseReceipt> {
        let (receipt, contract) = retry_stale("release_funds", self.max_write_attempts, || async move {
            let actor = self.users.require(actor_id).await?;
            let mut contract = self.contracts.require(contract_id).await?;
            authorize(&actor, &Action::ReleaseFunds { contract: &contract })?;

            let amount = contract.release(actor.is_admin())?;

            let mut engineer = self.users.require(contract.engineer_id).await?;
            let (credit, new_balance) = Ledger::stage_credit(&mut engineer, amount)?;

            let mut request = self.requests.require(contract.request_id).await?;
            request.complete();

            self.store
                .commit(vec![
                    Records::update_write(&contract)?,
                    credit,
                    Records::update_write(&request)?,
                ])
                .await?;

            let receipt = ReleaseReceipt {
                contract_id,
                credited_amount: amount,
                new_engineer_balance: new_balance,
            };
            Ok((receipt, contract.into_inner()))
        })
        .await?;

        tracing::info!(
            contract_id = %contract_id,
            engineer_id = %contract.engineer_id,
            amount = receipt.credited_amount,
            released_by = %actor_id,
            "Escrow released"
        );

        self.notifications
            .notify(
                contract.engineer_id,
                format!("Escrow released! ${} added to your wallet.", receipt.credited_amount),
                NotificationKind::Success,
                Some(contract.request_id),
            )
            .await;
        self.notifications
            .notify(
                contract.company_id,
                "Job marked complete. Funds released to engineer.",
                NotificationKind::Info,
                Some(contract.request_id),
            )
            .await;

        Ok(receipt)
    }

    /// Admin-only verification flag
    pub async fn admin_verify_contract(&self, admin_id: Uuid, contract_id: Uuid) -> AppResult<Contract> {
        let contract = retry_stale("verify_contract", self.max_write_attempts, || async move {
            let admin = self.users.require(admin_id).await?;
            let mut contract = self.contracts.require(contract_id).await?;
            authorize(&admin, &Action::VerifyContract { contract: &contract })?;

            contract.verify();
            self.contracts.update(&contract).await?;
            Ok(contract.into_inner())
        })
        .await?;

        tracing::info!(contract_id = %contract_id, admin_id = %admin_id, "Contract verified");
        Ok(contract)
    }

    pub async fn get(&self, contract_id: Uuid) -> AppResult<Contract> {
        Ok(self.contracts.require(contract_id).await?.into_inner())
    }

    /// Contracts the user is party to, or every contract for an admin; newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Contract>> {
        let user = self.users.require(user_id).await?;

        let mut contracts = if user.is_admin() {
            self.contracts.list().await?
        } else {
            let mut owned = self.contracts.where_eq("companyId", user_id).await?;
            owned.extend(self.contracts.where_eq("engineerId", user_id).await?);
            owned
        };
        contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contracts)
    }
}
