//! Notification records delivered to a single receiver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Back-reference to the request the message is about
    pub target_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        receiver_id: Uuid,
        message: impl Into<String>,
        kind: NotificationKind,
        target_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            receiver_id,
            message: message.into(),
            kind,
            target_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}
