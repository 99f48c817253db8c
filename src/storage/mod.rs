pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::application::{ApplicationStatus, JobApplication};
use crate::models::assessment::{Assessment, AssessmentKind, ConflictPolicy};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::certificate::{Certificate, NewCertificate};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed persistence outcomes. Adapters translate their native failures
/// (e.g. SQLSTATE 23505) into these variants so no caller ever inspects
/// driver error codes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub job_posting_id: Option<Uuid>,
    pub time_limit_minutes: i32,
    pub passing_score: i32,
    pub questions: JsonValue,
    pub created_by: Option<Uuid>,
}

/// Partial update; `None` keeps the stored value. Kind and job posting are
/// immutable after creation, changing them would orphan recorded attempts.
#[derive(Debug, Clone, Default)]
pub struct AssessmentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub passing_score: Option<i32>,
    pub questions: Option<JsonValue>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AssessmentFilter {
    pub kind: Option<AssessmentKind>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// Persistence port for the submission core. The Postgres adapter is the
/// production implementation; the in-memory adapter backs deterministic
/// tests without a database.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    // Assessment definitions
    async fn insert_assessment(&self, new: NewAssessment) -> StoreResult<Assessment>;
    async fn update_assessment(
        &self,
        id: Uuid,
        changes: AssessmentChanges,
    ) -> StoreResult<Assessment>;
    async fn delete_assessment(&self, id: Uuid) -> StoreResult<bool>;
    async fn fetch_assessment(&self, id: Uuid) -> StoreResult<Option<Assessment>>;
    async fn assessment_for_job_posting(
        &self,
        job_posting_id: Uuid,
    ) -> StoreResult<Option<Assessment>>;
    async fn list_assessments(
        &self,
        filter: AssessmentFilter,
        page: i64,
        per_page: i64,
    ) -> StoreResult<(Vec<Assessment>, i64)>;

    // Attempts
    async fn record_attempt(&self, new: NewAttempt, policy: ConflictPolicy)
        -> StoreResult<Attempt>;
    async fn attempt_for_user(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> StoreResult<Option<Attempt>>;
    async fn attempts_for_assessment(&self, assessment_id: Uuid) -> StoreResult<Vec<Attempt>>;

    // Certificates
    async fn insert_certificate(&self, new: NewCertificate) -> StoreResult<Certificate>;
    async fn certificate_for_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<Certificate>>;
    async fn certificate_by_code(&self, code: &str) -> StoreResult<Option<Certificate>>;

    // Job applications (pre-selection workflow)
    async fn fetch_application(&self, id: Uuid) -> StoreResult<Option<JobApplication>>;
    /// Guarded single-hop transition: applies `status` and `test_result_id`
    /// only while the application still sits in `TestRequired`. Returns
    /// whether the transition fired.
    async fn record_test_outcome(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
        attempt_id: Uuid,
    ) -> StoreResult<bool>;
}
