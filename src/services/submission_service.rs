use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::dto::submission_dto::SubmitAssessmentRequest;
use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::models::assessment::{Assessment, AssessmentKind, SKILL_ASSESSMENT_QUESTION_COUNT};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::certificate::Certificate;
use crate::models::question::Question;
use crate::services::certificate_service::CertificateService;
use crate::services::notification_service::Notifier;
use crate::services::scoring_service::ScoringService;
use crate::storage::{StoreError, SubmissionStore};

/// Orchestrates one submission end to end: load the definition, validate
/// the answer set, score, persist the attempt under the kind's conflict
/// policy, then run the dependent side effects (certificate, application
/// transition, notification).
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn SubmissionStore>,
    certificate_service: CertificateService,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: Attempt,
    pub passing_score: i32,
    pub badge_earned: bool,
    pub certificate: Option<Certificate>,
}

impl From<SubmissionOutcome> for crate::dto::submission_dto::SubmissionResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        Self {
            attempt_id: outcome.attempt.id,
            score: outcome.attempt.score,
            is_passed: outcome.attempt.passed,
            passing_score: outcome.passing_score,
            badge_earned: outcome.badge_earned,
            certificate: outcome
                .certificate
                .map(crate::dto::submission_dto::CertificateView::from),
        }
    }
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        certificate_service: CertificateService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            certificate_service,
            notifier,
        }
    }

    /// Standalone skill assessment: retakes overwrite the stored attempt,
    /// and a pass earns the badge alongside the certificate.
    pub async fn submit_skill_assessment(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
        request: SubmitAssessmentRequest,
    ) -> Result<SubmissionOutcome> {
        let assessment = self
            .store
            .fetch_assessment(assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound("assessment not found".to_string()))?;
        if assessment.kind != AssessmentKind::SkillAssessment {
            return Err(Error::NotFound(
                "assessment is not a skill assessment".to_string(),
            ));
        }

        let (attempt, certificate) = self.submit(user_id, &assessment, request).await?;
        self.notify_completion(&assessment, &attempt).await;

        Ok(SubmissionOutcome {
            badge_earned: attempt.passed,
            passing_score: assessment.passing_score,
            attempt,
            certificate,
        })
    }

    /// Pre-selection test gating a job application: one submission only,
    /// and the outcome drives the application's status transition.
    pub async fn submit_preselection_test(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        request: SubmitAssessmentRequest,
    ) -> Result<SubmissionOutcome> {
        let application = self
            .store
            .fetch_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("application not found".to_string()))?;
        if application.user_id != user_id {
            return Err(Error::Forbidden(
                "application belongs to another user".to_string(),
            ));
        }

        let assessment = self
            .store
            .assessment_for_job_posting(application.job_posting_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound("no pre-selection test for this job posting".to_string())
            })?;

        let (attempt, certificate) = self.submit(user_id, &assessment, request).await?;

        // The transition is guarded inside the store: it fires only while
        // the application still sits in TEST_REQUIRED. An application that
        // has moved on is left untouched, and the scored attempt stands
        // regardless of what happens here.
        let status = ApplicationStatus::from_test_outcome(attempt.passed);
        match self
            .store
            .record_test_outcome(application.id, status, attempt.id)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    application_id = %application.id,
                    ?status,
                    "application status updated from test outcome"
                );
            }
            Ok(false) => {
                tracing::info!(
                    application_id = %application.id,
                    "application not in TEST_REQUIRED; status left untouched"
                );
            }
            Err(err) => {
                tracing::error!(
                    application_id = %application.id,
                    error = %err,
                    "failed to record test outcome on application"
                );
            }
        }

        self.notify_completion(&assessment, &attempt).await;

        Ok(SubmissionOutcome {
            badge_earned: false,
            passing_score: assessment.passing_score,
            attempt,
            certificate,
        })
    }

    /// Latest stored attempt for the caller. Doubles as the certificate
    /// retry path: a passing attempt whose certificate write failed at
    /// submission time gets issuance re-invoked here.
    pub async fn latest_result(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<SubmissionOutcome> {
        let assessment = self
            .store
            .fetch_assessment(assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound("assessment not found".to_string()))?;
        let attempt = self
            .store
            .attempt_for_user(user_id, assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound("no attempt recorded for this assessment".to_string()))?;

        let certificate = self.certificate_service.issue_if_passed(&attempt).await?;

        Ok(SubmissionOutcome {
            badge_earned: assessment.kind == AssessmentKind::SkillAssessment && attempt.passed,
            passing_score: assessment.passing_score,
            attempt,
            certificate,
        })
    }

    async fn submit(
        &self,
        user_id: Uuid,
        assessment: &Assessment,
        request: SubmitAssessmentRequest,
    ) -> Result<(Attempt, Option<Certificate>)> {
        if !assessment.is_active {
            return Err(Error::BadRequest(
                "assessment is not accepting submissions".to_string(),
            ));
        }

        let questions = assessment.parsed_questions().map_err(|e| {
            Error::Misconfigured(format!("stored question set is unreadable: {}", e))
        })?;
        validate_question_set(assessment, &questions)?;

        let answers = request.answers.into_answer_map()?;
        validate_answer_set(&questions, &answers)?;

        let overtime = request.time_spent_minutes > assessment.time_limit_minutes;
        if overtime {
            tracing::warn!(
                user_id = %user_id,
                assessment_id = %assessment.id,
                time_spent_minutes = request.time_spent_minutes,
                time_limit_minutes = assessment.time_limit_minutes,
                "submission exceeded the time limit; scoring anyway"
            );
        }

        let outcome = ScoringService::score(&questions, &answers, assessment.passing_score);

        let new_attempt = NewAttempt {
            user_id,
            assessment_id: assessment.id,
            score: outcome.score_percent,
            passed: outcome.passed,
            time_spent_minutes: request.time_spent_minutes,
            overtime,
            answers: serde_json::to_value(&answers)?,
        };
        let attempt = self
            .store
            .record_attempt(new_attempt, assessment.kind.conflict_policy())
            .await
            .map_err(|err| match err {
                StoreError::Conflict => {
                    Error::Conflict("assessment has already been submitted".to_string())
                }
                other => other.into(),
            })?;

        // The attempt is durable at this point. Issuance failures degrade to
        // a missing certificate in the response and are retried via
        // latest_result, which re-invokes the idempotent issuance.
        let certificate = match self.certificate_service.issue_if_passed(&attempt).await {
            Ok(certificate) => certificate,
            Err(err) => {
                tracing::error!(
                    attempt_id = %attempt.id,
                    error = %err,
                    "certificate issuance failed; attempt is stored and issuance will be retried"
                );
                None
            }
        };

        Ok((attempt, certificate))
    }

    async fn notify_completion(&self, assessment: &Assessment, attempt: &Attempt) {
        let payload = json!({
            "event": "assessment_completed",
            "attempt_id": attempt.id,
            "user_id": attempt.user_id,
            "assessment": {
                "id": assessment.id,
                "title": assessment.title,
                "kind": assessment.kind,
            },
            "score": attempt.score,
            "passed": attempt.passed,
        });
        if let Err(err) = self.notifier.enqueue("assessment_completed", &payload).await {
            tracing::error!(error = %err, "failed to enqueue completion notification");
        }
    }
}

fn validate_question_set(assessment: &Assessment, questions: &[Question]) -> Result<()> {
    if questions.is_empty() {
        return Err(Error::Misconfigured(
            "assessment has no questions".to_string(),
        ));
    }
    if assessment.kind == AssessmentKind::SkillAssessment
        && questions.len() != SKILL_ASSESSMENT_QUESTION_COUNT
    {
        return Err(Error::Misconfigured(format!(
            "skill assessment must hold exactly {} questions, found {}",
            SKILL_ASSESSMENT_QUESTION_COUNT,
            questions.len()
        )));
    }
    Ok(())
}

fn validate_answer_set(questions: &[Question], answers: &BTreeMap<Uuid, String>) -> Result<()> {
    if answers.len() != questions.len() {
        return Err(Error::BadRequest(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }
    for question in questions {
        if !answers.contains_key(&question.id) {
            return Err(Error::BadRequest(format!(
                "missing answer for question {}",
                question.id
            )));
        }
    }
    Ok(())
}
