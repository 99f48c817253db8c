use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::assessment::{Assessment, AssessmentKind};
use crate::models::question::Question;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[validate(length(min = 1))]
    pub option_a: String,
    #[validate(length(min = 1))]
    pub option_b: String,
    #[validate(length(min = 1))]
    pub option_c: String,
    #[validate(length(min = 1))]
    pub option_d: String,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAssessmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub job_posting_id: Option<Uuid>,
    #[validate(range(min = 1, max = 480))]
    pub time_limit_minutes: i32,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i32,
    pub questions: Vec<CreateQuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateAssessmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 480))]
    pub time_limit_minutes: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    pub questions: Option<Vec<CreateQuestionPayload>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAssessmentsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub kind: Option<AssessmentKind>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// Applicant-facing question view; never carries the correct answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt,
            option_a: question.option_a,
            option_b: question.option_b,
            option_c: question.option_c,
            option_d: question.option_d,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAssessment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub time_limit_minutes: i32,
    pub passing_score: i32,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}

/// Listing row without the question bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub time_limit_minutes: i32,
    pub passing_score: i32,
    pub total_questions: usize,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(assessment: &Assessment) -> Self {
        let total_questions = assessment
            .questions
            .as_array()
            .map(|questions| questions.len())
            .unwrap_or(0);
        Self {
            id: assessment.id,
            title: assessment.title.clone(),
            description: assessment.description.clone(),
            kind: assessment.kind,
            time_limit_minutes: assessment.time_limit_minutes,
            passing_score: assessment.passing_score,
            total_questions,
        }
    }
}
