//! Service container wiring every marketplace service over one store.

use std::sync::Arc;

use common::{AppResult, MarketplaceConfig};

use crate::infra::{DocumentStore, MemoryStore};
use crate::service::accounts::AccountService;
use crate::service::contracts::ContractService;
use crate::service::credentials::AdminCredentials;
use crate::service::ledger::Ledger;
use crate::service::maintenance::{Diagnoser, MaintenanceService, ThresholdDiagnoser};
use crate::service::notifications::NotificationService;
use crate::service::offers::OfferService;
use crate::service::requests::RequestService;
use crate::service::reviews::ReviewService;

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn DocumentStore>,
    pub accounts: Arc<AccountService>,
    pub ledger: Arc<Ledger>,
    pub requests: Arc<RequestService>,
    pub offers: Arc<OfferService>,
    pub contracts: Arc<ContractService>,
    pub notifications: Arc<NotificationService>,
    pub reviews: Arc<ReviewService>,
    pub maintenance: Arc<MaintenanceService>,
}

impl Marketplace {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: MarketplaceConfig,
        credentials: AdminCredentials,
        diagnoser: Arc<dyn Diagnoser>,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(store.clone(), &config));

        Self {
            ledger: Arc::new(Ledger::new(store.clone(), &config)),
            requests: Arc::new(RequestService::new(store.clone())),
            offers: Arc::new(OfferService::new(store.clone(), notifications.clone())),
            contracts: Arc::new(ContractService::new(
                store.clone(),
                notifications.clone(),
                &config,
            )),
            reviews: Arc::new(ReviewService::new(store.clone(), &config)),
            maintenance: Arc::new(MaintenanceService::new(
                store.clone(),
                diagnoser,
                notifications.clone(),
                &config,
            )),
            accounts: Arc::new(AccountService::new(
                store.clone(),
                notifications.clone(),
                credentials,
                config,
            )),
            notifications,
            store,
        }
    }

    /// Single-process marketplace with the rule-based diagnoser
    pub fn in_memory(config: MarketplaceConfig, credentials: AdminCredentials) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            config,
            credentials,
            Arc::new(ThresholdDiagnoser::default()),
        )
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Check the backing store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
