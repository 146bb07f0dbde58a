//! Engineer proposals against a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::request::Request;
use crate::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Fields supplied by an engineer when proposing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub price: u64,
    pub description: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub start_date: Option<String>,
}

impl NewOffer {
    pub fn validate(&self) -> DomainResult<()> {
        if self.price == 0 {
            return Err(DomainError::validation("Price must be greater than zero"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("Description is required"));
        }
        Ok(())
    }
}

/// One-shot proposal; read-only once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    pub request_id: Uuid,
    pub engineer_id: Uuid,
    pub engineer_name: String,
    pub price: u64,
    pub description: String,
    pub timeline: String,
    pub start_date: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Propose on a request under the engineer's profile.
    pub fn propose(id: Uuid, request: &Request, engineer: &User, fields: NewOffer) -> DomainResult<Self> {
        if !engineer.is_loaded() {
            return Err(DomainError::ProfileIncomplete);
        }
        fields.validate()?;
        if !request.is_open() {
            return Err(DomainError::invalid_transition(
                "Request is completed and no longer accepts offers",
            ));
        }

        Ok(Self {
            id,
            request_id: request.id,
            engineer_id: engineer.id,
            engineer_name: engineer.name.clone(),
            price: fields.price,
            description: fields.description.trim().to_string(),
            timeline: fields.timeline.trim().to_string(),
            start_date: fields.start_date,
            status: OfferStatus::Pending,
            created_at: Utc::now(),
        })
    }
}
