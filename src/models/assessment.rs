use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::question::Question;

/// Skill assessments carry a fixed-size question set; anything else stored
/// for that kind is treated as data corruption at scoring time.
pub const SKILL_ASSESSMENT_QUESTION_COUNT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assessment_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    SkillAssessment,
    PreselectionTest,
}

/// What happens when a user resubmits an assessment they already attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The new submission overwrites the stored attempt.
    Upsert,
    /// The new submission is rejected; the stored attempt stays untouched.
    Reject,
}

impl AssessmentKind {
    /// The kind-to-policy mapping lives here and nowhere else: skill
    /// assessments are retakable, pre-selection tests are one-shot.
    pub fn conflict_policy(self) -> ConflictPolicy {
        match self {
            AssessmentKind::SkillAssessment => ConflictPolicy::Upsert,
            AssessmentKind::PreselectionTest => ConflictPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    /// Set for pre-selection tests; links the test to the job posting it gates.
    pub job_posting_id: Option<Uuid>,
    pub time_limit_minutes: i32,
    pub passing_score: i32,
    pub questions: JsonValue,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn parsed_questions(&self) -> serde_json::Result<Vec<Question>> {
        serde_json::from_value(self.questions.clone())
    }
}
