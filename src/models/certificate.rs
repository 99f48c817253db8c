use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Credential issued for a passing attempt. `attempt_id` is unique in
/// storage, which is what makes issuance at-most-once under concurrency.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub certificate_code: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub attempt_id: Uuid,
    pub certificate_code: String,
}
