//! Offer store - engineer proposals against a request.

use std::sync::Arc;

use uuid::Uuid;

use common::AppResult;
use domain::{authorize, Action, NewOffer, NotificationKind, Offer, Request, User};

use crate::infra::DocumentStore;
use crate::repository::Records;
use crate::service::notifications::NotificationService;

pub struct OfferService {
    offers: Records<Offer>,
    requests: Records<Request>,
    users: Records<User>,
    notifications: Arc<NotificationService>,
}

impl OfferService {
    pub fn new(store: Arc<dyn DocumentStore>, notifications: Arc<NotificationService>) -> Self {
        Self {
            offers: Records::new(store.clone()),
            requests: Records::new(store.clone()),
            users: Records::new(store),
            notifications,
        }
    }

    /// Propose on an open request and tell its owner
    pub async fn create_offer(
        &self,
        actor_id: Uuid,
        request_id: Uuid,
        fields: NewOffer,
    ) -> AppResult<Offer> {
        let actor = self.users.require(actor_id).await?;
        let request = self.requests.require(request_id).await?;
        authorize(&actor, &Action::CreateOffer { request: &request })?;

        let offer = Offer::propose(Uuid::new_v4(), &request, &actor, fields)?;
        self.offers.insert(&offer).await?;

        tracing::info!(
            offer_id = %offer.id,
            request_id = %request.id,
            engineer_id = %actor_id,
            "Offer submitted"
        );

        self.notifications
            .notify(
                request.contact_id,
                format!(
                    "New offer received from {} for {}",
                    offer.engineer_name, request.machine
                ),
                NotificationKind::Info,
                Some(request.id),
            )
            .await;

        Ok(offer)
    }

    /// Offers on a request, newest first
    pub async fn list_for_request(&self, request_id: Uuid) -> AppResult<Vec<Offer>> {
        self.requests.require(request_id).await?;

        let mut offers = self.offers.where_eq("requestId", request_id).await?;
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    pub async fn get(&self, offer_id: Uuid) -> AppResult<Offer> {
        Ok(self.offers.require(offer_id).await?.into_inner())
    }
}
