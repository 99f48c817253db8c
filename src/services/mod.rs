pub mod assessment_service;
pub mod certificate_service;
pub mod notification_service;
pub mod scoring_service;
pub mod submission_service;
