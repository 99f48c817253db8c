use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::AssessmentSummary;
use crate::dto::submission_dto::{SubmissionResponse, SubmitAssessmentRequest};
use crate::middleware::auth::Claims;
use crate::models::assessment::AssessmentKind;
use crate::services::assessment_service::AssessmentService;
use crate::storage::AssessmentFilter;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

/// Active skill assessments an applicant can take for a badge.
#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> crate::error::Result<Response> {
    let filter = AssessmentFilter {
        kind: Some(AssessmentKind::SkillAssessment),
        is_active: Some(true),
        search: query.search,
    };
    let listing = state
        .assessment_service
        .list_assessments(filter, query.page.unwrap_or(1), query.per_page.unwrap_or(20))
        .await?;

    let items: Vec<AssessmentSummary> = listing
        .assessments
        .iter()
        .map(AssessmentSummary::from)
        .collect();
    Ok(Json(serde_json::json!({
        "items": items,
        "total": listing.total,
        "page": listing.page,
        "per_page": listing.per_page,
        "total_pages": listing.total_pages,
    }))
    .into_response())
}

/// Definition as shown to a test taker; correct answers never leave here.
#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let assessment = state.assessment_service.get_assessment(id).await?;
    if !assessment.is_active {
        return Err(crate::error::Error::NotFound(
            "assessment not found".to_string(),
        ));
    }
    let view = AssessmentService::public_view(&assessment)?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let outcome = state
        .submission_service
        .submit_skill_assessment(user_id, id, req)
        .await?;

    tracing::info!(
        user_id = %user_id,
        assessment_id = %id,
        score = outcome.attempt.score,
        passed = outcome.attempt.passed,
        "skill assessment submitted"
    );

    Ok(Json(SubmissionResponse::from(outcome)).into_response())
}

/// Latest result for the caller; re-invokes certificate issuance for a
/// passing attempt that is still missing its certificate.
#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let outcome = state.submission_service.latest_result(user_id, id).await?;
    Ok(Json(SubmissionResponse::from(outcome)).into_response())
}
