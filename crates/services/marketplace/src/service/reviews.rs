//! Reviews left by a company on the engineer after escrow release.

use std::sync::Arc;

use uuid::Uuid;

use common::{AppError, AppResult, MarketplaceConfig};
use domain::{authorize, average_rating, Action, Contract, Review, User};

use crate::infra::DocumentStore;
use crate::repository::Records;
use crate::service::retry::retry_stale;

pub struct ReviewService {
    store: Arc<dyn DocumentStore>,
    reviews: Records<Review>,
    contracts: Records<Contract>,
    users: Records<User>,
    max_write_attempts: u32,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &MarketplaceConfig) -> Self {
        Self {
            reviews: Records::new(store.clone()),
            contracts: Records::new(store.clone()),
            users: Records::new(store.clone()),
            store,
            max_write_attempts: config.max_write_attempts,
        }
    }

    /// Rate the engineer of a released contract. One review per contract.
    ///
    /// The review and the engineer's running rating are written together.
    pub async fn submit_review(&self, actor_id: Uuid, contract_id: Uuid, rating: u8) -> AppResult<Review> {
        let review = retry_stale("submit_review", self.max_write_attempts, || async move {
            let actor = self.users.require(actor_id).await?;
            let contract = self.contracts.require(contract_id).await?;
            authorize(&actor, &Action::SubmitReview { contract: &contract })?;

            let review = Review::for_contract(&contract, actor_id, rating)?;
            if self.reviews.find(review.id).await?.is_some() {
                return Err(AppError::conflict("Contract has already been reviewed"));
            }

            let mut engineer = self.users.require(contract.engineer_id).await?;
            let count = f64::from(engineer.reviews_count);
            engineer.rating = if engineer.reviews_count == 0 {
                f64::from(rating)
            } else {
                (engineer.rating * count + f64::from(rating)) / (count + 1.0)
            };
            engineer.reviews_count += 1;

            let writes = vec![Records::insert_write(&review)?, Records::update_write(&engineer)?];
            match self.store.commit(writes).await {
                Err(AppError::Conflict(_)) => {
                    return Err(AppError::conflict("Contract has already been reviewed"))
                }
                other => other?,
            }
            Ok(review)
        })
        .await?;

        tracing::info!(
            contract_id = %contract_id,
            engineer_id = %review.engineer_id,
            rating,
            "Review submitted"
        );
        Ok(review)
    }

    /// Mean of the engineer's stored reviews, `None` before the first one
    pub async fn engineer_rating(&self, engineer_id: Uuid) -> AppResult<Option<f64>> {
        let reviews = self.reviews.where_eq("engineerId", engineer_id).await?;
        Ok(average_rating(&reviews))
    }
}
