//! Write-once ratings left by a company after escrow release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_RATING, MIN_RATING, REVIEW_ID_NAMESPACE};
use crate::contract::Contract;
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub engineer_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Review id reserved for a contract, so a contract is reviewed at most once
    pub fn id_for_contract(contract_id: Uuid) -> Uuid {
        Uuid::new_v5(&REVIEW_ID_NAMESPACE, contract_id.as_bytes())
    }

    pub fn for_contract(contract: &Contract, reviewer_id: Uuid, rating: u8) -> DomainResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if !contract.released {
            return Err(DomainError::invalid_transition(
                "Only completed contracts can be reviewed",
            ));
        }

        Ok(Self {
            id: Self::id_for_contract(contract.id),
            contract_id: contract.id,
            engineer_id: contract.engineer_id,
            reviewer_id,
            rating,
            created_at: Utc::now(),
        })
    }
}

/// Mean rating, or `None` when there are no reviews
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    Some(f64::from(total) / reviews.len() as f64)
}
