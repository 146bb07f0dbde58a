//! Account service - session profiles, registration and moderation.

use std::sync::Arc;

use uuid::Uuid;

use common::{AppError, AppResult, MarketplaceConfig};
use domain::{authorize, Action, EmailClaim, NotificationKind, SubscriptionTier, User, UserType};

use crate::infra::DocumentStore;
use crate::repository::Records;
use crate::service::credentials::AdminCredentials;
use crate::service::notifications::NotificationService;
use crate::service::retry::retry_stale;

/// Name given to an elevated profile that never registered
const DEFAULT_ADMIN_NAME: &str = "Administrator";

const EMAIL_TAKEN: &str = "This email is already registered. Please login instead.";

pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    users: Records<User>,
    notifications: Arc<NotificationService>,
    credentials: AdminCredentials,
    config: MarketplaceConfig,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifications: Arc<NotificationService>,
        credentials: AdminCredentials,
        config: MarketplaceConfig,
    ) -> Self {
        Self {
            users: Records::new(store.clone()),
            store,
            notifications,
            credentials,
            config,
        }
    }

    /// Create the guest profile backing a new session
    pub async fn start_session(&self) -> AppResult<User> {
        let user = User::guest(Uuid::new_v4());
        self.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, "Guest session started");
        Ok(user)
    }

    /// Overwrite a guest profile with a company or engineer account, keeping its id.
    pub async fn register(
        &self,
        user_id: Uuid,
        email: &str,
        name: &str,
        user_type: UserType,
    ) -> AppResult<User> {
        let email = email.trim().to_lowercase();

        let user = retry_stale("register", self.config.max_write_attempts, || {
            let email = email.clone();
            let name = name.to_string();
            async move {
                let mut profile = self.users.require(user_id).await?;
                if profile.is_banned() {
                    return Err(AppError::forbidden("account is banned"));
                }
                if profile.user_type != UserType::Guest {
                    return Err(AppError::conflict("Profile is already registered"));
                }
                if let Some(existing) = self.find_by_email(&email).await? {
                    if existing.id != user_id {
                        return Err(AppError::conflict(EMAIL_TAKEN));
                    }
                }

                let claim = EmailClaim::new(&email, user_id);
                profile.register(email, name, user_type)?;
                profile.balance = match user_type {
                    UserType::Company => self.config.company_starting_balance,
                    _ => self.config.engineer_starting_balance,
                };

                // The claim id is derived from the email, so a concurrent
                // registration of the same address collides on insert
                let writes = vec![
                    Records::<User>::update_write(&profile)?,
                    Records::<EmailClaim>::insert_write(&claim)?,
                ];
                match self.store.commit(writes).await {
                    Err(AppError::Conflict(_)) => return Err(AppError::conflict(EMAIL_TAKEN)),
                    other => other?,
                }
                Ok(profile.into_inner())
            }
        })
        .await?;

        tracing::info!(user_id = %user.id, user_type = %user.user_type, "Account registered");
        Ok(user)
    }

    /// Rewrite the session profile as an admin after checking the seeded credentials.
    pub async fn elevate_to_admin(&self, user_id: Uuid, email: &str, password: &str) -> AppResult<User> {
        if !self.credentials.verify(email, password) {
            tracing::warn!(user_id = %user_id, "Rejected admin elevation attempt");
            return Err(AppError::InvalidCredentials);
        }
        let email = email.trim().to_lowercase();

        let user = retry_stale("elevate_to_admin", self.config.max_write_attempts, || {
            let email = email.clone();
            async move {
                let mut profile = self.users.require(user_id).await?;
                if profile.is_banned() {
                    return Err(AppError::forbidden("account is banned"));
                }

                let name = if profile.name.trim().is_empty() {
                    DEFAULT_ADMIN_NAME.to_string()
                } else {
                    profile.name.clone()
                };
                profile.promote_to_admin(email, name);

                self.users.update(&profile).await?;
                Ok(profile.into_inner())
            }
        })
        .await?;

        tracing::info!(user_id = %user.id, "Session elevated to admin");
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        Ok(self.users.require(user_id).await?.into_inner())
    }

    /// Case-insensitive lookup of a registered email
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users.where_eq("email", &email).await?.into_iter().next())
    }

    /// Move the actor onto a paid plan
    pub async fn upgrade_subscription(&self, actor_id: Uuid, tier: SubscriptionTier) -> AppResult<User> {
        let user = retry_stale("upgrade_subscription", self.config.max_write_attempts, || async move {
            let mut actor = self.users.require(actor_id).await?;
            authorize(&actor, &Action::UpgradeSubscription { account: actor_id })?;

            actor.subscribe(tier)?;
            self.users.update(&actor).await?;
            Ok(actor.into_inner())
        })
        .await?;

        tracing::info!(user_id = %user.id, tier = ?tier, "Subscription upgraded");
        Ok(user)
    }

    pub async fn set_banned(&self, admin_id: Uuid, target_id: Uuid, banned: bool) -> AppResult<User> {
        let user = retry_stale("set_banned", self.config.max_write_attempts, || async move {
            let admin = self.users.require(admin_id).await?;
            let mut target = self.users.require(target_id).await?;
            authorize(&admin, &Action::ModerateUser { target: &target })?;

            target.set_banned(banned);
            self.users.update(&target).await?;
            Ok(target.into_inner())
        })
        .await?;

        tracing::info!(admin_id = %admin_id, user_id = %target_id, banned, "Account ban status changed");
        Ok(user)
    }

    /// Grant or revoke the verified badge and tell the user
    pub async fn set_verified(&self, admin_id: Uuid, target_id: Uuid, verified: bool) -> AppResult<User> {
        let user = retry_stale("set_verified", self.config.max_write_attempts, || async move {
            let admin = self.users.require(admin_id).await?;
            let mut target = self.users.require(target_id).await?;
            authorize(&admin, &Action::ModerateUser { target: &target })?;

            target.set_verified(verified);
            self.users.update(&target).await?;
            Ok(target.into_inner())
        })
        .await?;

        let (message, kind) = if verified {
            ("Your account has been verified by Administration!", NotificationKind::Success)
        } else {
            ("Your verification badge has been revoked.", NotificationKind::Warning)
        };
        self.notifications.notify(target_id, message, kind, None).await;

        tracing::info!(admin_id = %admin_id, user_id = %target_id, verified, "Account verification changed");
        Ok(user)
    }

    pub async fn list_users(&self, admin_id: Uuid) -> AppResult<Vec<User>> {
        let admin = self.users.require(admin_id).await?;
        authorize(&admin, &Action::ListUsers)?;

        self.users.list().await
    }
}
