//! Service layer - business logic over the document store.

mod accounts;
mod container;
mod contracts;
mod credentials;
mod ledger;
mod maintenance;
mod notifications;
mod offers;
mod requests;
mod retry;
mod reviews;

pub use accounts::AccountService;
pub use container::Marketplace;
pub use contracts::{ContractService, ReleaseReceipt};
pub use credentials::AdminCredentials;
pub use ledger::Ledger;
pub use maintenance::{
    Analysis, Diagnoser, Diagnosis, HealthStatus, MachineReading, MaintenanceService,
    SensorSample, ThresholdDiagnoser,
};
pub use notifications::{NotificationFeed, NotificationService};
pub use offers::OfferService;
pub use requests::RequestService;
pub use reviews::ReviewService;

#[cfg(any(test, feature = "test-utils"))]
pub use maintenance::MockDiagnoser;
