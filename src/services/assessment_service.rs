use std::sync::Arc;

use uuid::Uuid;

use crate::dto::assessment_dto::{
    CreateAssessmentPayload, CreateQuestionPayload, PublicAssessment, PublicQuestion,
    UpdateAssessmentPayload,
};
use crate::error::{Error, Result};
use crate::models::assessment::{
    Assessment, AssessmentKind, SKILL_ASSESSMENT_QUESTION_COUNT,
};
use crate::models::attempt::Attempt;
use crate::models::question::{AnswerOption, Question};
use crate::storage::{AssessmentChanges, AssessmentFilter, NewAssessment, SubmissionStore};

#[derive(Debug, serde::Serialize)]
pub struct PaginatedAssessments {
    #[serde(rename = "items")]
    pub assessments: Vec<Assessment>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Administrator-facing definition management. Question sets are validated
/// at write time so scoring only ever sees well-formed data; a violation
/// that still reaches the scorer is reported as a configuration failure.
#[derive(Clone)]
pub struct AssessmentService {
    store: Arc<dyn SubmissionStore>,
}

impl AssessmentService {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    pub async fn create_assessment(
        &self,
        payload: CreateAssessmentPayload,
        created_by: Uuid,
    ) -> Result<Assessment> {
        let questions = materialize_questions(&payload.questions)?;
        enforce_question_count(payload.kind, questions.len())?;
        if payload.kind == AssessmentKind::PreselectionTest && payload.job_posting_id.is_none() {
            return Err(Error::BadRequest(
                "pre-selection tests must reference a job posting".to_string(),
            ));
        }

        let new = NewAssessment {
            title: payload.title,
            description: payload.description,
            kind: payload.kind,
            job_posting_id: payload.job_posting_id,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score,
            questions: serde_json::to_value(&questions)?,
            created_by: Some(created_by),
        };
        Ok(self.store.insert_assessment(new).await?)
    }

    pub async fn update_assessment(
        &self,
        id: Uuid,
        payload: UpdateAssessmentPayload,
    ) -> Result<Assessment> {
        let existing = self.get_assessment(id).await?;

        let questions_json = match payload.questions {
            Some(payloads) => {
                let questions = materialize_questions(&payloads)?;
                enforce_question_count(existing.kind, questions.len())?;
                Some(serde_json::to_value(&questions)?)
            }
            None => None,
        };

        let changes = AssessmentChanges {
            title: payload.title,
            description: payload.description,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score,
            questions: questions_json,
            is_active: payload.is_active,
        };
        Ok(self.store.update_assessment(id, changes).await?)
    }

    pub async fn get_assessment(&self, id: Uuid) -> Result<Assessment> {
        self.store
            .fetch_assessment(id)
            .await?
            .ok_or_else(|| Error::NotFound("assessment not found".to_string()))
    }

    pub async fn list_assessments(
        &self,
        filter: AssessmentFilter,
        page: i64,
        per_page: i64,
    ) -> Result<PaginatedAssessments> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let (assessments, total) = self.store.list_assessments(filter, page, per_page).await?;
        let total_pages = (total + per_page - 1) / per_page;
        Ok(PaginatedAssessments {
            assessments,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn delete_assessment(&self, id: Uuid) -> Result<bool> {
        Ok(self.store.delete_assessment(id).await?)
    }

    pub async fn list_attempts(&self, assessment_id: Uuid) -> Result<Vec<Attempt>> {
        // surface a 404 rather than an empty list for unknown ids
        self.get_assessment(assessment_id).await?;
        Ok(self.store.attempts_for_assessment(assessment_id).await?)
    }

    /// Applicant view of a definition, with correct answers stripped.
    pub fn public_view(assessment: &Assessment) -> Result<PublicAssessment> {
        let questions = assessment.parsed_questions().map_err(|e| {
            Error::Misconfigured(format!("stored question set is unreadable: {}", e))
        })?;
        Ok(PublicAssessment {
            id: assessment.id,
            title: assessment.title.clone(),
            description: assessment.description.clone(),
            kind: assessment.kind,
            time_limit_minutes: assessment.time_limit_minutes,
            passing_score: assessment.passing_score,
            total_questions: questions.len(),
            questions: questions.into_iter().map(PublicQuestion::from).collect(),
        })
    }
}

fn materialize_questions(payloads: &[CreateQuestionPayload]) -> Result<Vec<Question>> {
    if payloads.is_empty() {
        return Err(Error::BadRequest(
            "assessment needs at least one question".to_string(),
        ));
    }
    payloads
        .iter()
        .map(|payload| {
            let correct_answer = AnswerOption::parse_selection(&payload.correct_answer)
                .ok_or_else(|| {
                    Error::BadRequest(format!(
                        "invalid correct answer '{}'; expected A, B, C or D",
                        payload.correct_answer
                    ))
                })?;
            Ok(Question {
                id: Uuid::new_v4(),
                prompt: payload.prompt.clone(),
                option_a: payload.option_a.clone(),
                option_b: payload.option_b.clone(),
                option_c: payload.option_c.clone(),
                option_d: payload.option_d.clone(),
                correct_answer,
            })
        })
        .collect()
}

fn enforce_question_count(kind: AssessmentKind, count: usize) -> Result<()> {
    if kind == AssessmentKind::SkillAssessment && count != SKILL_ASSESSMENT_QUESTION_COUNT {
        return Err(Error::BadRequest(format!(
            "skill assessments must contain exactly {} questions, got {}",
            SKILL_ASSESSMENT_QUESTION_COUNT, count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;

    fn question_payload(correct: &str) -> CreateQuestionPayload {
        CreateQuestionPayload {
            prompt: "What does ownership move?".to_string(),
            option_a: "the value".to_string(),
            option_b: "a reference".to_string(),
            option_c: "a copy".to_string(),
            option_d: "nothing".to_string(),
            correct_answer: correct.to_string(),
        }
    }

    fn skill_payload() -> CreateAssessmentPayload {
        CreateAssessmentPayload {
            title: "Rust basics".to_string(),
            description: Some("entry level".to_string()),
            kind: AssessmentKind::SkillAssessment,
            job_posting_id: None,
            time_limit_minutes: 30,
            passing_score: 70,
            questions: (0..SKILL_ASSESSMENT_QUESTION_COUNT)
                .map(|_| question_payload("A"))
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_assigns_question_ids_and_activates() {
        let service = AssessmentService::new(Arc::new(InMemoryStore::new()));
        let assessment = service
            .create_assessment(skill_payload(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(assessment.is_active);
        let questions = assessment.parsed_questions().unwrap();
        assert_eq!(questions.len(), SKILL_ASSESSMENT_QUESTION_COUNT);
        let mut ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), SKILL_ASSESSMENT_QUESTION_COUNT);
    }

    #[tokio::test]
    async fn skill_assessments_require_the_fixed_question_count() {
        let service = AssessmentService::new(Arc::new(InMemoryStore::new()));
        let mut payload = skill_payload();
        payload.questions.truncate(10);

        let err = service
            .create_assessment(payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn preselection_requires_job_posting() {
        let service = AssessmentService::new(Arc::new(InMemoryStore::new()));
        let payload = CreateAssessmentPayload {
            title: "Gate test".to_string(),
            description: None,
            kind: AssessmentKind::PreselectionTest,
            job_posting_id: None,
            time_limit_minutes: 20,
            passing_score: 60,
            questions: vec![question_payload("C")],
        };

        let err = service
            .create_assessment(payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn invalid_correct_answer_is_rejected() {
        let service = AssessmentService::new(Arc::new(InMemoryStore::new()));
        let mut payload = skill_payload();
        payload.questions[0] = question_payload("E");

        let err = service
            .create_assessment(payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn public_view_strips_correct_answers() {
        let service = AssessmentService::new(Arc::new(InMemoryStore::new()));
        let assessment = service
            .create_assessment(skill_payload(), Uuid::new_v4())
            .await
            .unwrap();

        let view = AssessmentService::public_view(&assessment).unwrap();
        assert_eq!(view.total_questions, SKILL_ASSESSMENT_QUESTION_COUNT);
        let as_json = serde_json::to_string(&view).unwrap();
        assert!(!as_json.contains("correct_answer"));
    }
}
