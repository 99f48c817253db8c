use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::certificate::Certificate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: Uuid,
    pub selected_option: String,
}

/// Clients send answers either as a list of entries or as a question-id to
/// option map; both normalize to the same map before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswersPayload {
    Entries(Vec<AnswerEntry>),
    Map(HashMap<Uuid, String>),
}

impl AnswersPayload {
    pub fn into_answer_map(self) -> Result<BTreeMap<Uuid, String>> {
        match self {
            AnswersPayload::Entries(entries) => {
                let mut map = BTreeMap::new();
                for entry in entries {
                    if map
                        .insert(entry.question_id, entry.selected_option)
                        .is_some()
                    {
                        return Err(Error::BadRequest(format!(
                            "duplicate answer for question {}",
                            entry.question_id
                        )));
                    }
                }
                Ok(map)
            }
            AnswersPayload::Map(map) => Ok(map.into_iter().collect()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAssessmentRequest {
    pub answers: AnswersPayload,
    #[validate(range(min = 0))]
    pub time_spent_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateView {
    pub certificate_code: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl From<Certificate> for CertificateView {
    fn from(certificate: Certificate) -> Self {
        Self {
            certificate_code: certificate.certificate_code,
            issue_date: certificate.issue_date,
            expiry_date: certificate.expiry_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub attempt_id: Uuid,
    pub score: i32,
    pub is_passed: bool,
    pub passing_score: i32,
    pub badge_earned: bool,
    pub certificate: Option<CertificateView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateVerification {
    pub certificate_code: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

impl From<Certificate> for CertificateVerification {
    fn from(certificate: Certificate) -> Self {
        let expired = certificate
            .expiry_date
            .map_or(false, |expiry| expiry <= Utc::now());
        Self {
            certificate_code: certificate.certificate_code,
            issue_date: certificate.issue_date,
            expiry_date: certificate.expiry_date,
            is_valid: certificate.is_valid && !expired,
        }
    }
}
