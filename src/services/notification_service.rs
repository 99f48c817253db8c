use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::webhook_log::WebhookLog;
use crate::utils::signature::sign_payload;

/// Outbound event hook. Completion events are best-effort: callers log
/// enqueue failures and never fail a submission over them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enqueue(&self, event_type: &str, payload: &JsonValue) -> Result<()>;
}

/// Queue-backed notifier. Events land in webhook_logs and a background
/// worker drains them with bounded retries, so a slow or down receiver
/// never blocks the request path.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
        }
    }

    pub async fn deliver_once(&self, log_id: Uuid) -> Result<()> {
        let log = sqlx::query_as::<_, WebhookLog>("SELECT * FROM webhook_logs WHERE id = $1")
            .bind(log_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("failed to load webhook log: {}", e)))?;

        let body = serde_json::to_vec(&log.payload)?;
        let secret = &crate::config::get_config().webhook_secret;
        let signature = sign_payload(secret, &body);

        let res = self
            .client
            .post(&log.target_url)
            .header("Content-Type", "application/json")
            .header("X-Signature", signature)
            .body(body)
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE webhook_logs
                       SET http_status = $1, response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'success' ELSE 'failed' END,
                           attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(body)
                .bind(log.id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Internal(format!("failed to update webhook log: {}", e)))?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE webhook_logs
                       SET response_body = $1, status = 'failed',
                           attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(err.to_string())
                .bind(log.id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Internal(format!("failed to update webhook log: {}", e)))?;
            }
        }
        Ok(())
    }

    /// Picks one due delivery, attempts it, and schedules a retry on
    /// failure. Returns whether any work was found.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"SELECT id FROM webhook_logs
               WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("failed to poll webhook queue: {}", e)))?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| Error::Internal(format!("malformed webhook row: {}", e)))?;

        let _ = self.deliver_once(id).await;

        let row =
            sqlx::query("SELECT attempts, max_attempts, status FROM webhook_logs WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::Internal(format!("failed to re-read webhook log: {}", e)))?;
        let attempts: i32 = row
            .try_get("attempts")
            .map_err(|e| Error::Internal(format!("malformed webhook row: {}", e)))?;
        let max_attempts: i32 = row
            .try_get::<Option<i32>, _>("max_attempts")
            .map_err(|e| Error::Internal(format!("malformed webhook row: {}", e)))?
            .unwrap_or(3);
        let status: String = row
            .try_get("status")
            .map_err(|e| Error::Internal(format!("malformed webhook row: {}", e)))?;

        if status == "failed" && attempts < max_attempts {
            let backoff_secs = (30_i64 << attempts.saturating_sub(1).min(7)).min(3600);
            let next_retry = Utc::now() + chrono::Duration::seconds(backoff_secs);
            sqlx::query(
                "UPDATE webhook_logs SET status = 'pending', next_retry_at = $1 WHERE id = $2",
            )
            .bind(next_retry)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("failed to schedule webhook retry: {}", e)))?;
        }

        Ok(true)
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn enqueue(&self, event_type: &str, payload: &JsonValue) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO webhook_logs (event_type, payload, target_url, status)
               VALUES ($1, $2, $3, 'pending')"#,
        )
        .bind(event_type)
        .bind(payload)
        .bind(&self.target_url)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("failed to enqueue webhook: {}", e)))?;
        Ok(())
    }
}

/// Records events instead of delivering them; used by tests to assert what
/// the submission flow emitted.
#[derive(Default)]
pub struct CollectingNotifier {
    pub events: std::sync::Mutex<Vec<(String, JsonValue)>>,
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn enqueue(&self, event_type: &str, payload: &JsonValue) -> Result<()> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push((event_type.to_string(), payload.clone()));
        Ok(())
    }
}
