use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A scored submission of one user for one assessment. At most one row
/// exists per (user_id, assessment_id); whether a resubmission overwrites
/// or is rejected depends on the assessment kind's conflict policy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assessment_id: Uuid,
    pub score: i32,
    pub passed: bool,
    pub time_spent_minutes: i32,
    /// Client-reported time exceeded the assessment's limit. The attempt is
    /// still scored; the flag keeps late submissions queryable for review.
    pub overtime: bool,
    /// Map of question id to the raw submitted option.
    pub answers: JsonValue,
    pub completed_at: DateTime<Utc>,
}

/// Insertion record; id and completion timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub assessment_id: Uuid,
    pub score: i32,
    pub passed: bool,
    pub time_spent_minutes: i32,
    pub overtime: bool,
    pub answers: JsonValue,
}
