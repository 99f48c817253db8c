pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    assessment_service::AssessmentService, certificate_service::CertificateService,
    notification_service::Notifier, submission_service::SubmissionService,
};
use crate::storage::SubmissionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub assessment_service: AssessmentService,
    pub submission_service: SubmissionService,
    pub certificate_service: CertificateService,
}

impl AppState {
    pub fn new(store: Arc<dyn SubmissionStore>, notifier: Arc<dyn Notifier>) -> Self {
        let assessment_service = AssessmentService::new(store.clone());
        let certificate_service = CertificateService::new(store.clone());
        let submission_service =
            SubmissionService::new(store.clone(), certificate_service.clone(), notifier);

        Self {
            store,
            assessment_service,
            submission_service,
            certificate_service,
        }
    }
}
