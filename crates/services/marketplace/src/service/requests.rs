//! Request store - job postings and the browse filters over them.

use std::sync::Arc;

use uuid::Uuid;

use common::AppResult;
use domain::{
    authorize, matches_specialties, Action, NewRequest, Request, RequestFilter, User,
};

use crate::infra::DocumentStore;
use crate::repository::Records;

pub struct RequestService {
    requests: Records<Request>,
    users: Records<User>,
}

impl RequestService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            requests: Records::new(store.clone()),
            users: Records::new(store),
        }
    }

    /// Post a request under the actor's company profile
    pub async fn create_request(&self, actor_id: Uuid, fields: NewRequest) -> AppResult<Request> {
        let actor = self.users.require(actor_id).await?;
        authorize(&actor, &Action::CreateRequest)?;

        let request = Request::post(Uuid::new_v4(), &actor, fields)?;
        self.requests.insert(&request).await?;

        tracing::info!(request_id = %request.id, company_id = %actor_id, "Request posted");
        Ok(request)
    }

    pub async fn get(&self, request_id: Uuid) -> AppResult<Request> {
        Ok(self.requests.require(request_id).await?.into_inner())
    }

    /// Every request, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Request>> {
        let mut requests = self.requests.list().await?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Requests matching every populated criterion, newest first
    pub async fn filter(&self, filter: &RequestFilter) -> AppResult<Vec<Request>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    /// Open requests whose machine matches one of the engineer's specialties
    pub async fn smart_match(&self, engineer_id: Uuid) -> AppResult<Vec<Request>> {
        let engineer = self.users.require(engineer_id).await?;

        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.is_open() && matches_specialties(&engineer.specialties, r))
            .collect())
    }
}
