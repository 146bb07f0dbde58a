//! Domain layer - Marketplace entities, lifecycle rules and access policy.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Every type here is shared by the marketplace services and the gateway.

pub mod constants;
pub mod contract;
pub mod error;
pub mod notification;
pub mod offer;
pub mod password;
pub mod policy;
pub mod request;
pub mod review;
pub mod user;

pub use constants::*;
pub use contract::{Contract, ContractPhase, ContractStatus, ContractType, Party};
pub use error::{DomainError, DomainResult};
pub use notification::{Notification, NotificationKind};
pub use offer::{NewOffer, Offer, OfferStatus};
pub use password::Password;
pub use policy::{authorize, can_perform, Action};
pub use request::{matches_specialties, NewRequest, Priority, Request, RequestFilter, RequestStatus};
pub use review::{average_rating, Review};
pub use user::{AccountStatus, EmailClaim, Features, SubscriptionTier, User, UserType};
