//! `TokenStore` — the two-phase confirmation protocol over a
//! [`KVDocStore`] at `users/{owner}/requests` (spec §4.4).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use confidant_core::{KVDocStore, WhereClause};
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{ConfirmationRequest, RequestStatus};

/// spec §3: `expires_at = created_at + 5 min`.
pub const TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

pub struct TokenStore {
    kv: Arc<dyn KVDocStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KVDocStore>) -> Self {
        Self { kv }
    }

    fn path(user_id: &str) -> String {
        format!("users/{user_id}/requests")
    }

    /// `createRequest(user_id, action, payload) -> {request_id, token}`.
    /// `token` is a separate opaque random identifier from `request_id` —
    /// callers downstream of the issuing operation only ever see the
    /// token, never the KV document id.
    pub async fn create_request(
        &self,
        user_id: &str,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<(String, String)> {
        let request_id = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(TOKEN_TTL).expect("TOKEN_TTL fits in chrono::Duration");

        let request = ConfirmationRequest {
            request_id: request_id.clone(),
            user_id: user_id.to_string(),
            token: token.clone(),
            action: action.to_string(),
            payload,
            created_at,
            expires_at,
            status: RequestStatus::Pending,
            confirmed_at: None,
        };
        self.kv.set(&Self::path(user_id), &request_id, serde_json::to_value(&request)?, false).await?;
        info!(user = user_id, action, request_id, "confirmation request created");
        Ok((request_id, token))
    }

    async fn find_by_token(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Option<(String, ConfirmationRequest)>> {
        let matches = self
            .kv
            .query(&Self::path(user_id), &[WhereClause::eq("token", token)], Some(1))
            .await?;
        match matches.into_iter().next() {
            Some((id, value)) => Ok(Some((id, serde_json::from_value(value)?))),
            None => Ok(None),
        }
    }

    /// `validateToken(user_id, token)`: requires `status = pending`;
    /// lazily transitions an overdue `pending` token to `expired` and
    /// returns `None` for it.
    pub async fn validate_token(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Option<ConfirmationRequest>> {
        let Some((id, request)) = self.find_by_token(user_id, token).await? else {
            return Ok(None);
        };
        if request.status.is_terminal() {
            return Ok(None);
        }
        if Utc::now() > request.expires_at {
            self.expire(user_id, &id).await;
            return Ok(None);
        }
        Ok(Some(request))
    }

    async fn expire(&self, user_id: &str, request_id: &str) {
        let path = Self::path(user_id);
        let patch = serde_json::json!({ "status": "expired" });
        if let Err(err) =
            self.kv.compare_and_set(&path, request_id, "status", serde_json::json!("pending"), patch).await
        {
            warn!(user = user_id, request_id, error = %err, "failed to lazily expire confirmation token");
        }
    }

    /// Guarded `pending -> terminal` transition — a compare-and-set on the
    /// current status, never a read-then-write, so at most one caller ever
    /// observes the transition succeed (spec §4.4 "Concurrency").
    async fn transition(
        &self,
        user_id: &str,
        token: &str,
        new_status: RequestStatus,
        stamp_confirmed_at: bool,
    ) -> Result<bool> {
        let Some((id, request)) = self.find_by_token(user_id, token).await? else {
            return Ok(false);
        };
        if request.status.is_terminal() {
            return Ok(false);
        }
        if Utc::now() > request.expires_at {
            self.expire(user_id, &id).await;
            return Ok(false);
        }

        let status_str = serde_json::to_value(new_status)?;
        let mut patch = serde_json::json!({ "status": status_str });
        if stamp_confirmed_at {
            patch["confirmed_at"] = serde_json::to_value(Utc::now())?;
        }
        self.kv
            .compare_and_set(&Self::path(user_id), &id, "status", serde_json::json!("pending"), patch)
            .await
    }

    pub async fn confirm_request(&self, user_id: &str, token: &str) -> Result<bool> {
        self.transition(user_id, token, RequestStatus::Confirmed, true).await
    }

    pub async fn deny_request(&self, user_id: &str, token: &str) -> Result<bool> {
        self.transition(user_id, token, RequestStatus::Denied, false).await
    }

    pub async fn retract_request(&self, user_id: &str, token: &str) -> Result<bool> {
        self.transition(user_id, token, RequestStatus::Retracted, false).await
    }
}
