use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::application::{ApplicationStatus, JobApplication};
use crate::models::assessment::{Assessment, AssessmentKind, ConflictPolicy};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::certificate::{Certificate, NewCertificate};

use super::{
    AssessmentChanges, AssessmentFilter, NewAssessment, StoreError, StoreResult, SubmissionStore,
};

#[derive(Default)]
struct Inner {
    assessments: HashMap<Uuid, Assessment>,
    attempts: HashMap<Uuid, Attempt>,
    attempt_index: HashMap<(Uuid, Uuid), Uuid>,
    certificates: HashMap<Uuid, Certificate>,
    certificate_by_attempt: HashMap<Uuid, Uuid>,
    applications: HashMap<Uuid, JobApplication>,
}

/// Hash-map store used by unit and router tests. Behaves like the Postgres
/// adapter, including the uniqueness semantics on attempts and certificates.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_certificate_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent certificate insert fail with
    /// `StoreError::Unavailable`, for exercising the issuance retry path.
    pub fn set_fail_certificate_inserts(&self, fail: bool) {
        self.fail_certificate_inserts.store(fail, Ordering::SeqCst);
    }

    /// Test seeding helper; application creation itself is outside the core.
    pub fn seed_application(
        &self,
        user_id: Uuid,
        job_posting_id: Uuid,
        status: ApplicationStatus,
    ) -> JobApplication {
        let application = JobApplication {
            id: Uuid::new_v4(),
            user_id,
            job_posting_id,
            status,
            test_result_id: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .applications
            .insert(application.id, application.clone());
        application
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn insert_assessment(&self, new: NewAssessment) -> StoreResult<Assessment> {
        let now = Utc::now();
        let assessment = Assessment {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            kind: new.kind,
            job_posting_id: new.job_posting_id,
            time_limit_minutes: new.time_limit_minutes,
            passing_score: new.passing_score,
            questions: new.questions,
            is_active: true,
            created_by: new.created_by,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.assessments.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        id: Uuid,
        changes: AssessmentChanges,
    ) -> StoreResult<Assessment> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let assessment = inner.assessments.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = changes.title {
            assessment.title = title;
        }
        if let Some(description) = changes.description {
            assessment.description = Some(description);
        }
        if let Some(limit) = changes.time_limit_minutes {
            assessment.time_limit_minutes = limit;
        }
        if let Some(passing_score) = changes.passing_score {
            assessment.passing_score = passing_score;
        }
        if let Some(questions) = changes.questions {
            assessment.questions = questions;
        }
        if let Some(is_active) = changes.is_active {
            assessment.is_active = is_active;
        }
        assessment.updated_at = Some(Utc::now());
        Ok(assessment.clone())
    }

    async fn delete_assessment(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.assessments.remove(&id).is_some())
    }

    async fn fetch_assessment(&self, id: Uuid) -> StoreResult<Option<Assessment>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.assessments.get(&id).cloned())
    }

    async fn assessment_for_job_posting(
        &self,
        job_posting_id: Uuid,
    ) -> StoreResult<Option<Assessment>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .assessments
            .values()
            .find(|a| {
                a.kind == AssessmentKind::PreselectionTest
                    && a.job_posting_id == Some(job_posting_id)
            })
            .cloned())
    }

    async fn list_assessments(
        &self,
        filter: AssessmentFilter,
        page: i64,
        per_page: i64,
    ) -> StoreResult<(Vec<Assessment>, i64)> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let needle = filter.search.map(|s| s.to_lowercase());
        let mut rows: Vec<Assessment> = inner
            .assessments
            .values()
            .filter(|a| filter.kind.map_or(true, |k| a.kind == k))
            .filter(|a| filter.is_active.map_or(true, |active| a.is_active == active))
            .filter(|a| {
                needle.as_ref().map_or(true, |n| {
                    a.title.to_lowercase().contains(n)
                        || a.description
                            .as_ref()
                            .map_or(false, |d| d.to_lowercase().contains(n))
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = rows.len() as i64;
        let offset = ((page - 1) * per_page).max(0) as usize;
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(per_page.max(0) as usize)
            .collect();
        Ok((rows, total))
    }

    async fn record_attempt(
        &self,
        new: NewAttempt,
        policy: ConflictPolicy,
    ) -> StoreResult<Attempt> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let key = (new.user_id, new.assessment_id);

        let id = match (inner.attempt_index.get(&key), policy) {
            (Some(_), ConflictPolicy::Reject) => return Err(StoreError::Conflict),
            (Some(existing), ConflictPolicy::Upsert) => *existing,
            (None, _) => Uuid::new_v4(),
        };

        let attempt = Attempt {
            id,
            user_id: new.user_id,
            assessment_id: new.assessment_id,
            score: new.score,
            passed: new.passed,
            time_spent_minutes: new.time_spent_minutes,
            overtime: new.overtime,
            answers: new.answers,
            completed_at: Utc::now(),
        };
        inner.attempt_index.insert(key, id);
        inner.attempts.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn attempt_for_user(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> StoreResult<Option<Attempt>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .attempt_index
            .get(&(user_id, assessment_id))
            .and_then(|id| inner.attempts.get(id))
            .cloned())
    }

    async fn attempts_for_assessment(&self, assessment_id: Uuid) -> StoreResult<Vec<Attempt>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|a| a.assessment_id == assessment_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(attempts)
    }

    async fn insert_certificate(&self, new: NewCertificate) -> StoreResult<Certificate> {
        if self.fail_certificate_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "certificate storage offline".to_string(),
            ));
        }
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.certificate_by_attempt.contains_key(&new.attempt_id) {
            return Err(StoreError::Conflict);
        }
        let certificate = Certificate {
            id: Uuid::new_v4(),
            attempt_id: new.attempt_id,
            certificate_code: new.certificate_code,
            issue_date: Utc::now(),
            expiry_date: None,
            is_valid: true,
        };
        inner
            .certificate_by_attempt
            .insert(new.attempt_id, certificate.id);
        inner
            .certificates
            .insert(certificate.id, certificate.clone());
        Ok(certificate)
    }

    async fn certificate_for_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<Certificate>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .certificate_by_attempt
            .get(&attempt_id)
            .and_then(|id| inner.certificates.get(id))
            .cloned())
    }

    async fn certificate_by_code(&self, code: &str) -> StoreResult<Option<Certificate>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .certificates
            .values()
            .find(|c| c.certificate_code == code)
            .cloned())
    }

    async fn fetch_application(&self, id: Uuid) -> StoreResult<Option<JobApplication>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.applications.get(&id).cloned())
    }

    async fn record_test_outcome(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
        attempt_id: Uuid,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let Some(application) = inner.applications.get_mut(&application_id) else {
            return Ok(false);
        };
        if application.status != ApplicationStatus::TestRequired {
            return Ok(false);
        }
        application.status = status;
        application.test_result_id = Some(attempt_id);
        application.updated_at = Some(Utc::now());
        Ok(true)
    }
}
