use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    TestRequired,
    TestCompleted,
    InterviewScheduled,
    InterviewCompleted,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Status a pre-selection test outcome moves an application to.
    /// Only applied while the application sits in `TestRequired`.
    pub fn from_test_outcome(passed: bool) -> Self {
        if passed {
            ApplicationStatus::TestCompleted
        } else {
            ApplicationStatus::Rejected
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_posting_id: Uuid,
    pub status: ApplicationStatus,
    /// Attempt that completed this application's pre-selection test, once
    /// the test-driven transition has fired.
    pub test_result_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
