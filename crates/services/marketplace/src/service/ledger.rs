//! Wallet ledger. Balances only ever increase: escrow release and simulated
//! top-ups are the sole mutations.

use std::sync::Arc;

use uuid::Uuid;

use common::{AppError, AppResult, MarketplaceConfig};
use domain::{authorize, Action, User};

use crate::infra::{DocumentStore, Write};
use crate::repository::{Records, Versioned};
use crate::service::retry::retry_stale;

pub struct Ledger {
    users: Records<User>,
    max_write_attempts: u32,
}

impl Ledger {
    pub fn new(store: Arc<dyn DocumentStore>, config: &MarketplaceConfig) -> Self {
        Self {
            users: Records::new(store),
            max_write_attempts: config.max_write_attempts,
        }
    }

    /// The ledger credit: add `amount` to a wallet read at a known version and
    /// return the versioned write with the new balance. It is never committed
    /// alone; escrow release batches it with the contract update.
    pub fn stage_credit(user: &mut Versioned<User>, amount: u64) -> AppResult<(Write, u64)> {
        let balance = user.credit(amount)?;
        Ok((Records::update_write(user)?, balance))
    }

    /// Simulated deposit into the actor's own wallet
    pub async fn top_up(&self, actor_id: Uuid, wallet_owner: Uuid, amount: i64) -> AppResult<u64> {
        let amount = u64::try_from(amount)
            .ok()
            .filter(|a| *a > 0)
            .ok_or_else(|| AppError::validation("Amount must be a positive number"))?;

        let balance = retry_stale("top_up", self.max_write_attempts, || async move {
            let mut actor = self.users.require(actor_id).await?;
            authorize(&actor, &Action::TopUp { wallet_owner })?;

            let balance = actor.credit(amount)?;
            self.users.update(&actor).await?;
            Ok(balance)
        })
        .await?;

        tracing::info!(user_id = %actor_id, amount, balance, "Wallet topped up");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryStore;
    use domain::UserType;

    async fn seeded_engineer(store: &Arc<dyn DocumentStore>) -> User {
        let mut user = User::guest(Uuid::new_v4());
        user.register("eng@example.com".into(), "Eve".into(), UserType::Engineer)
            .unwrap();
        Records::<User>::new(store.clone()).insert(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn top_up_rejects_non_positive_amounts() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let user = seeded_engineer(&store).await;
        let ledger = Ledger::new(store, &MarketplaceConfig::default());

        for amount in [0, -50] {
            assert!(matches!(
                ledger.top_up(user.id, user.id, amount).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn top_up_is_self_only() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let user = seeded_engineer(&store).await;
        let ledger = Ledger::new(store, &MarketplaceConfig::default());

        assert!(matches!(
            ledger.top_up(user.id, Uuid::new_v4(), 100).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(ledger.top_up(user.id, user.id, 100).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn staged_credit_rejects_overflow() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let user = seeded_engineer(&store).await;
        let mut stored = Records::<User>::new(store).require(user.id).await.unwrap();

        let (write, balance) = Ledger::stage_credit(&mut stored, 250).unwrap();
        assert_eq!(balance, 250);
        assert!(matches!(write, Write::Update { expected_version: 1, .. }));

        assert!(matches!(
            Ledger::stage_credit(&mut stored, u64::MAX),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_top_ups_are_all_applied() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let user = seeded_engineer(&store).await;
        let ledger = Arc::new(Ledger::new(store.clone(), &MarketplaceConfig {
            max_write_attempts: 50,
            ..MarketplaceConfig::default()
        }));

        let user_id = user.id;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.top_up(user_id, user_id, 10).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = Records::<User>::new(store).require(user_id).await.unwrap();
        assert_eq!(stored.balance, 100);
    }
}
