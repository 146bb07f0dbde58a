//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    COMPANY_STARTING_BALANCE, DEFAULT_ENGINEER_SPECIALTIES, DEFAULT_RATING,
    EMAIL_CLAIM_NAMESPACE, ENGINEER_STARTING_BALANCE,
};
use crate::error::{DomainError, DomainResult};

/// Account type. A guest is a session placeholder that has not registered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Company,
    Engineer,
    Admin,
}

impl UserType {
    /// Check if this type can be chosen through public registration
    pub fn is_registrable(&self) -> bool {
        matches!(self, UserType::Company | UserType::Engineer)
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UserType::Guest => "guest",
            UserType::Company => "company",
            UserType::Engineer => "engineer",
            UserType::Admin => "admin",
        };
        write!(f, "{}", label)
    }
}

/// Moderation status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Banned,
}

/// Paid plan of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    None,
    Premium,
    PremiumPlus,
}

/// Feature flags unlocked by a subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub can_link_iot_sensors: bool,
    pub has_professional_install: bool,
    pub unlimited_chatbot: bool,
}

impl Features {
    /// Flags granted by a tier
    pub fn for_tier(tier: SubscriptionTier) -> Self {
        let plus = tier == SubscriptionTier::PremiumPlus;
        Self {
            can_link_iot_sensors: tier != SubscriptionTier::None,
            has_professional_install: plus,
            unlimited_chatbot: plus,
        }
    }
}

/// User profile record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub balance: u64,
    pub rating: f64,
    pub reviews_count: u32,
    pub verified: bool,
    pub status: AccountStatus,
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create the placeholder profile of a fresh session
    pub fn guest(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: String::new(),
            name: String::new(),
            user_type: UserType::Guest,
            balance: 0,
            rating: DEFAULT_RATING,
            reviews_count: 0,
            verified: false,
            status: AccountStatus::Active,
            subscription_tier: SubscriptionTier::None,
            features: Features::default(),
            specialties: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite this profile with a registered account, keeping its id.
    pub fn register(&mut self, email: String, name: String, user_type: UserType) -> DomainResult<()> {
        if !user_type.is_registrable() {
            return Err(DomainError::forbidden(format!(
                "{} accounts cannot be created through registration",
                user_type
            )));
        }
        let email = email.trim().to_string();
        let name = name.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("A valid email is required"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("Name cannot be empty"));
        }

        let now = Utc::now();
        self.email = email;
        self.name = name;
        self.user_type = user_type;
        self.balance = match user_type {
            UserType::Company => COMPANY_STARTING_BALANCE,
            _ => ENGINEER_STARTING_BALANCE,
        };
        self.rating = DEFAULT_RATING;
        self.reviews_count = 0;
        self.verified = false;
        self.status = AccountStatus::Active;
        self.subscription_tier = SubscriptionTier::None;
        self.features = Features::default();
        self.specialties = match user_type {
            UserType::Engineer => DEFAULT_ENGINEER_SPECIALTIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            _ => Vec::new(),
        };
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Rewrite this profile as a platform administrator
    pub fn promote_to_admin(&mut self, email: String, name: String) {
        self.email = email;
        self.name = name;
        self.user_type = UserType::Admin;
        self.verified = true;
        self.status = AccountStatus::Active;
        self.specialties.clear();
        self.updated_at = Utc::now();
    }

    /// Check if user has admin type
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// Check if user is banned
    pub fn is_banned(&self) -> bool {
        self.status == AccountStatus::Banned
    }

    /// Check if the profile is complete enough to act under (registered and named)
    pub fn is_loaded(&self) -> bool {
        self.user_type != UserType::Guest && !self.name.trim().is_empty()
    }

    /// Add funds to the wallet, returning the new balance
    pub fn credit(&mut self, amount: u64) -> DomainResult<u64> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("Balance overflow"))?;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Ban or unban the account
    pub fn set_banned(&mut self, banned: bool) {
        self.status = if banned {
            AccountStatus::Banned
        } else {
            AccountStatus::Active
        };
        self.updated_at = Utc::now();
    }

    /// Grant or revoke the verified badge
    pub fn set_verified(&mut self, verified: bool) {
        self.verified = verified;
        self.updated_at = Utc::now();
    }

    /// Switch to a paid plan and unlock its features
    pub fn subscribe(&mut self, tier: SubscriptionTier) -> DomainResult<()> {
        if tier == SubscriptionTier::None {
            return Err(DomainError::validation("Choose a paid tier to upgrade"));
        }
        self.subscription_tier = tier;
        self.features = Features::for_tier(tier);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Ownership of a registration email by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailClaim {
    pub id: Uuid,
    pub email: String,
    pub user_id: Uuid,
    pub claimed_at: DateTime<Utc>,
}

impl EmailClaim {
    /// Claim id of an address; case and surrounding whitespace are ignored
    pub fn id_for(email: &str) -> Uuid {
        Uuid::new_v5(&EMAIL_CLAIM_NAMESPACE, email.trim().to_lowercase().as_bytes())
    }

    pub fn new(email: &str, user_id: Uuid) -> Self {
        let email = email.trim().to_lowercase();
        Self {
            id: Self::id_for(&email),
            email,
            user_id,
            claimed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_keeps_identity_and_sets_defaults() {
        let id = Uuid::new_v4();
        let mut user = User::guest(id);

        user.register("eng@example.com".into(), "Eve".into(), UserType::Engineer)
            .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.user_type, UserType::Engineer);
        assert_eq!(user.balance, ENGINEER_STARTING_BALANCE);
        assert_eq!(user.specialties.len(), DEFAULT_ENGINEER_SPECIALTIES.len());
        assert!(user.is_loaded());
    }

    #[test]
    fn email_claim_id_ignores_case_and_padding() {
        let owner = Uuid::new_v4();
        let claim = EmailClaim::new("  Plant@Acme.Example ", owner);

        assert_eq!(claim.email, "plant@acme.example");
        assert_eq!(claim.id, EmailClaim::id_for("plant@acme.example"));
        assert_ne!(claim.id, EmailClaim::id_for("other@acme.example"));
        assert_eq!(claim.user_id, owner);
    }

    #[test]
    fn register_rejects_admin_type() {
        let mut user = User::guest(Uuid::new_v4());
        let err = user
            .register("root@example.com".into(), "Root".into(), UserType::Admin)
            .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(user.user_type, UserType::Guest);
    }

    #[test]
    fn guest_is_not_loaded() {
        assert!(!User::guest(Uuid::new_v4()).is_loaded());
    }

    #[test]
    fn credit_detects_overflow() {
        let mut user = User::guest(Uuid::new_v4());
        user.balance = u64::MAX;

        assert!(user.credit(1).is_err());
        assert_eq!(user.balance, u64::MAX);
    }

    #[test]
    fn premium_plus_unlocks_every_feature() {
        let mut user = User::guest(Uuid::new_v4());
        user.subscribe(SubscriptionTier::PremiumPlus).unwrap();

        assert!(user.features.can_link_iot_sensors);
        assert!(user.features.has_professional_install);
        assert!(user.features.unlimited_chatbot);
        assert!(user.subscribe(SubscriptionTier::None).is_err());
    }
}
