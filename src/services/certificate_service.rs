use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::attempt::Attempt;
use crate::models::certificate::{Certificate, NewCertificate};
use crate::storage::{StoreError, SubmissionStore};
use crate::utils::code::generate_certificate_code;

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn SubmissionStore>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// At-most-once issuance. Failing attempts get nothing; a passing
    /// attempt that already owns a certificate gets the stored record back.
    /// Safe to call any number of times, including concurrently: losing an
    /// insert race resolves to the winner's row.
    pub async fn issue_if_passed(&self, attempt: &Attempt) -> Result<Option<Certificate>> {
        if !attempt.passed {
            return Ok(None);
        }

        if let Some(existing) = self.store.certificate_for_attempt(attempt.id).await? {
            return Ok(Some(existing));
        }

        let new = NewCertificate {
            attempt_id: attempt.id,
            certificate_code: generate_certificate_code(),
        };
        match self.store.insert_certificate(new).await {
            Ok(certificate) => Ok(Some(certificate)),
            Err(StoreError::Conflict) => {
                let existing = self
                    .store
                    .certificate_for_attempt(attempt.id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal("certificate conflict without a stored row".to_string())
                    })?;
                Ok(Some(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn verify(&self, code: &str) -> Result<Certificate> {
        self.store
            .certificate_by_code(code)
            .await?
            .ok_or_else(|| Error::NotFound("certificate not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn attempt(passed: bool) -> Attempt {
        Attempt {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            score: if passed { 80 } else { 40 },
            passed,
            time_spent_minutes: 10,
            overtime: false,
            answers: json!({}),
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn no_certificate_for_failing_attempt() {
        let service = CertificateService::new(Arc::new(InMemoryStore::new()));
        let issued = service.issue_if_passed(&attempt(false)).await.unwrap();
        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn issuance_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let service = CertificateService::new(store.clone());
        let attempt = attempt(true);

        let first = service.issue_if_passed(&attempt).await.unwrap().unwrap();
        let second = service.issue_if_passed(&attempt).await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.certificate_code, second.certificate_code);

        let stored = store.certificate_for_attempt(attempt.id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn issuance_failure_is_retryable() {
        let store = Arc::new(InMemoryStore::new());
        let service = CertificateService::new(store.clone());
        let attempt = attempt(true);

        store.set_fail_certificate_inserts(true);
        assert!(service.issue_if_passed(&attempt).await.is_err());

        store.set_fail_certificate_inserts(false);
        let issued = service.issue_if_passed(&attempt).await.unwrap();
        assert!(issued.is_some());
    }

    #[tokio::test]
    async fn verify_finds_by_code() {
        let store = Arc::new(InMemoryStore::new());
        let service = CertificateService::new(store);
        let attempt = attempt(true);

        let issued = service.issue_if_passed(&attempt).await.unwrap().unwrap();
        let found = service.verify(&issued.certificate_code).await.unwrap();
        assert_eq!(found.attempt_id, attempt.id);

        assert!(service.verify("CERT-MISSING00000").await.is_err());
    }
}
