//! Contract entity and its lifecycle.
//!
//! A contract moves through these phases:
//!
//! - **Editable**: drafted from an offer, nobody has signed; either party may
//!   rewrite the content.
//! - **Signed by one**: one party set its own flag; content is frozen.
//! - **Fully signed**: both flags set; the engagement is underway.
//! - **Released** (terminal): escrow paid out to the engineer.
//!
//! Parties are fixed at draft time. There is no un-sign transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CONTRACT_ID_NAMESPACE, CONTRACT_STANDARD_TERMS};
use crate::error::{DomainError, DomainResult};
use crate::offer::Offer;
use crate::request::Request;
use crate::user::UserType;

/// Template chosen by the company when drafting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ContractType {
    Standard,
    Warranty,
    Emergency,
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContractType::Standard => "Standard",
            ContractType::Warranty => "Warranty",
            ContractType::Emergency => "Emergency",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ContractStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "Completed")]
    Completed,
}

/// Signing side of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Company,
    Engineer,
}

impl Party {
    /// Side a user type signs for, if any
    pub fn for_user_type(user_type: UserType) -> Option<Self> {
        match user_type {
            UserType::Company => Some(Party::Company),
            UserType::Engineer => Some(Party::Engineer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Company => write!(f, "company"),
            Party::Engineer => write!(f, "engineer"),
        }
    }
}

/// Derived lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractPhase {
    Editable,
    SignedByOne(Party),
    FullySigned,
    Released,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub request_id: Uuid,
    pub company_id: Uuid,
    pub engineer_id: Uuid,
    pub title: String,
    pub content: String,
    pub price: u64,
    pub status: ContractStatus,
    pub company_signed: bool,
    pub engineer_signed: bool,
    pub paid: bool,
    pub released: bool,
    pub admin_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Contract id reserved for an offer. At most one contract exists per offer.
    pub fn id_for_offer(offer_id: Uuid) -> Uuid {
        Uuid::new_v5(&CONTRACT_ID_NAMESPACE, offer_id.as_bytes())
    }

    /// Draft a contract from an offer on the company's request.
    pub fn draft(offer: &Offer, request: &Request, contract_type: ContractType) -> DomainResult<Self> {
        if offer.request_id != request.id {
            return Err(DomainError::validation("Offer does not belong to this request"));
        }
        if !request.is_open() {
            return Err(DomainError::invalid_transition("Request is already completed"));
        }

        Ok(Self {
            id: Self::id_for_offer(offer.id),
            offer_id: offer.id,
            request_id: request.id,
            company_id: request.contact_id,
            engineer_id: offer.engineer_id,
            title: format!("{} Contract", contract_type),
            content: format!(
                "Scope of Work: {}\n\n{}",
                offer.description, CONTRACT_STANDARD_TERMS
            ),
            price: offer.price,
            status: ContractStatus::Pending,
            company_signed: false,
            engineer_signed: false,
            paid: false,
            released: false,
            admin_verified: false,
            created_at: Utc::now(),
        })
    }

    pub fn phase(&self) -> ContractPhase {
        match (self.released, self.company_signed, self.engineer_signed) {
            (true, _, _) => ContractPhase::Released,
            (false, true, true) => ContractPhase::FullySigned,
            (false, true, false) => ContractPhase::SignedByOne(Party::Company),
            (false, false, true) => ContractPhase::SignedByOne(Party::Engineer),
            (false, false, false) => ContractPhase::Editable,
        }
    }

    /// Content may change only while neither party has signed
    pub fn is_editable(&self) -> bool {
        !self.company_signed && !self.engineer_signed && !self.released
    }

    pub fn is_fully_signed(&self) -> bool {
        self.company_signed && self.engineer_signed
    }

    /// Side the user is on, if they are a party at all
    pub fn party_of(&self, user_id: Uuid) -> Option<Party> {
        if user_id == self.company_id {
            Some(Party::Company)
        } else if user_id == self.engineer_id {
            Some(Party::Engineer)
        } else {
            None
        }
    }

    pub fn has_signed(&self, party: Party) -> bool {
        match party {
            Party::Company => self.company_signed,
            Party::Engineer => self.engineer_signed,
        }
    }

    /// The other side's user id
    pub fn counterpart(&self, party: Party) -> Uuid {
        match party {
            Party::Company => self.engineer_id,
            Party::Engineer => self.company_id,
        }
    }

    pub fn rewrite(&mut self, content: String) -> DomainResult<()> {
        if !self.is_editable() {
            return Err(DomainError::invalid_transition(
                "Contract content is frozen once a party has signed",
            ));
        }
        if content.trim().is_empty() {
            return Err(DomainError::validation("Contract content cannot be empty"));
        }
        self.content = content;
        Ok(())
    }

    /// Set one party's signature flag. Each flag flips false -> true exactly once.
    pub fn sign(&mut self, party: Party) -> DomainResult<()> {
        if self.released {
            return Err(DomainError::invalid_transition("Contract is already completed"));
        }
        if self.has_signed(party) {
            return Err(DomainError::conflict(format!(
                "Contract already signed by the {}",
                party
            )));
        }
        match party {
            Party::Company => self.company_signed = true,
            Party::Engineer => self.engineer_signed = true,
        }
        Ok(())
    }

    /// Close the contract and return the amount owed to the engineer.
    ///
    /// Without `forced`, both parties must have signed.
    pub fn release(&mut self, forced: bool) -> DomainResult<u64> {
        if self.released {
            return Err(DomainError::AlreadyReleased);
        }
        if !forced && !self.is_fully_signed() {
            return Err(DomainError::invalid_transition(
                "Both parties must sign before funds are released",
            ));
        }
        self.released = true;
        self.paid = true;
        self.status = ContractStatus::Completed;
        Ok(self.price)
    }

    pub fn verify(&mut self) {
        self.admin_verified = true;
    }
}
