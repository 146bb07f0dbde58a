//! Maintenance request (job posting) entity and the query filters over it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{AUTOMATED_ISSUE_PREFIX, AUTOMATED_REQUEST_BUDGET};
use crate::error::{DomainError, DomainResult};
use crate::user::User;

/// Request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum RequestStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

/// Urgency of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Priority {
    #[default]
    Normal,
    Critical,
}

/// Fields supplied by a company when posting a request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub machine: String,
    pub machine_type: String,
    pub issue: String,
    pub budget: u64,
    pub location: String,
}

impl NewRequest {
    /// Reject postings with missing required fields
    pub fn validate(&self) -> DomainResult<()> {
        if self.machine.trim().is_empty() {
            return Err(DomainError::validation("Machine is required"));
        }
        if self.issue.trim().is_empty() {
            return Err(DomainError::validation("Issue description is required"));
        }
        Ok(())
    }
}

/// Job posting owned by a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub company_name: String,
    pub machine: String,
    pub machine_type: String,
    pub issue: String,
    pub budget: u64,
    pub location: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub is_automated: bool,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Post a request under the owner's profile.
    pub fn post(id: Uuid, owner: &User, fields: NewRequest) -> DomainResult<Self> {
        if !owner.is_loaded() {
            return Err(DomainError::ProfileIncomplete);
        }
        fields.validate()?;

        Ok(Self {
            id,
            contact_id: owner.id,
            company_name: owner.name.clone(),
            machine: fields.machine.trim().to_string(),
            machine_type: fields.machine_type.trim().to_string(),
            issue: fields.issue.trim().to_string(),
            budget: fields.budget,
            location: fields.location.trim().to_string(),
            status: RequestStatus::Active,
            is_automated: false,
            priority: Priority::Normal,
            created_at: Utc::now(),
        })
    }

    /// Raise a critical request on behalf of the owner after a failed diagnosis
    pub fn automated(
        id: Uuid,
        owner: &User,
        machine: String,
        machine_type: String,
        location: String,
        advice: &str,
    ) -> DomainResult<Self> {
        let fields = NewRequest {
            machine,
            machine_type,
            issue: format!("{} {}", AUTOMATED_ISSUE_PREFIX, advice.trim()),
            budget: AUTOMATED_REQUEST_BUDGET,
            location,
        };
        let mut request = Self::post(id, owner, fields)?;
        request.is_automated = true;
        request.priority = Priority::Critical;
        Ok(request)
    }

    /// Check if the request still accepts offers
    pub fn is_open(&self) -> bool {
        self.status != RequestStatus::Completed
    }

    /// Close the request after escrow release
    pub fn complete(&mut self) {
        self.status = RequestStatus::Completed;
    }
}

/// Case-insensitive substring match; an absent needle matches everything.
fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Browse filter over requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub machine_type: Option<String>,
    pub location: Option<String>,
    pub budget_min: Option<u64>,
    pub budget_max: Option<u64>,
}

impl RequestFilter {
    /// Check a request against every populated criterion
    pub fn matches(&self, request: &Request) -> bool {
        contains_ci(&request.machine_type, self.machine_type.as_deref())
            && contains_ci(&request.location, self.location.as_deref())
            && self.budget_min.map_or(true, |min| request.budget >= min)
            && self.budget_max.map_or(true, |max| request.budget <= max)
    }
}

/// Smart match: any specialty appears in the request's machine type or machine name.
pub fn matches_specialties(specialties: &[String], request: &Request) -> bool {
    let machine_type = request.machine_type.to_lowercase();
    let machine = request.machine.to_lowercase();

    specialties
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .any(|s| machine_type.contains(&s) || machine.contains(&s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserType;

    fn company() -> User {
        let mut user = User::guest(Uuid::new_v4());
        user.register("acme@example.com".into(), "Acme".into(), UserType::Company)
            .unwrap();
        user
    }

    fn request(machine: &str, machine_type: &str, location: &str, budget: u64) -> Request {
        Request::post(
            Uuid::new_v4(),
            &company(),
            NewRequest {
                machine: machine.into(),
                machine_type: machine_type.into(),
                issue: "Spindle vibrates".into(),
                budget,
                location: location.into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn post_requires_loaded_profile() {
        let guest = User::guest(Uuid::new_v4());
        let err = Request::post(
            Uuid::new_v4(),
            &guest,
            NewRequest {
                machine: "Lathe".into(),
                machine_type: "CNC Machine".into(),
                issue: "Noise".into(),
                budget: 100,
                location: "Floor 1".into(),
            },
        )
        .unwrap_err();

        assert_eq!(err, DomainError::ProfileIncomplete);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let r = request("Lathe X200", "CNC Machine", "Casablanca Plant", 800);

        let filter = RequestFilter {
            machine_type: Some("cnc".into()),
            location: Some("CASA".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));

        let filter = RequestFilter {
            location: Some("Rabat".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }

    #[test]
    fn filter_applies_budget_bounds() {
        let r = request("Press", "Hydraulic Press", "Floor 2", 500);

        let inside = RequestFilter {
            budget_min: Some(400),
            budget_max: Some(500),
            ..Default::default()
        };
        let above = RequestFilter {
            budget_min: Some(501),
            ..Default::default()
        };
        assert!(inside.matches(&r));
        assert!(!above.matches(&r));
    }

    #[test]
    fn smart_match_checks_machine_and_type() {
        let by_type = request("Unit 9", "Hydraulic Press", "Roof", 10);
        let by_name = request("Robotic Arm R-2000", "Robotics", "Line A", 10);
        let none = request("Cooling Unit", "HVAC", "Roof", 10);
        let specialties = vec!["hydraulic press".to_string(), "Robotic Arm".to_string()];

        assert!(matches_specialties(&specialties, &by_type));
        assert!(matches_specialties(&specialties, &by_name));
        assert!(!matches_specialties(&specialties, &none));
        assert!(!matches_specialties(&[], &by_type));
    }

    #[test]
    fn automated_request_is_critical() {
        let r = Request::automated(
            Uuid::new_v4(),
            &company(),
            "Cooling Unit 09".into(),
            "HVAC".into(),
            "Roof".into(),
            "Compressor overheating",
        )
        .unwrap();

        assert!(r.is_automated);
        assert_eq!(r.priority, Priority::Critical);
        assert_eq!(r.issue, "[AI DETECTED FAILURE] Compressor overheating");
        assert_eq!(r.budget, AUTOMATED_REQUEST_BUDGET);
    }
}
