//! Application state for dependency injection.

use std::sync::Arc;

use marketplace_lib::service::Marketplace;

use crate::session::SessionTokens;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub sessions: Arc<SessionTokens>,
}

impl AppState {
    pub fn new(market: Marketplace, sessions: SessionTokens) -> Self {
        Self {
            market,
            sessions: Arc::new(sessions),
        }
    }
}
