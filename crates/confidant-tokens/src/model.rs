//! Confirmation Request data model (spec §3 "Confirmation Request").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Denied,
    Expired,
    Retracted,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub request_id: String,
    pub user_id: String,
    pub token: String,
    /// Open-ended (`publish_memory`, `retract_memory`, `revise_memory`, …)
    /// so C6 can add new sensitive-action kinds without touching this crate.
    pub action: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
}
