use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::submission_dto::{SubmissionResponse, SubmitAssessmentRequest};
use crate::middleware::auth::Claims;
use crate::AppState;

/// Pre-selection test submission for one of the caller's applications.
/// A passing or failing outcome also moves the application through its
/// TEST_REQUIRED hop; an application already past that point is untouched.
#[axum::debug_handler]
pub async fn submit_preselection_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let outcome = state
        .submission_service
        .submit_preselection_test(user_id, application_id, req)
        .await?;

    tracing::info!(
        user_id = %user_id,
        application_id = %application_id,
        score = outcome.attempt.score,
        passed = outcome.attempt.passed,
        "pre-selection test submitted"
    );

    Ok(Json(SubmissionResponse::from(outcome)).into_response())
}
