use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::{
    CreateAssessmentPayload, ListAssessmentsQuery, UpdateAssessmentPayload,
};
use crate::middleware::auth::Claims;
use crate::storage::AssessmentFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let created_by = claims.user_id()?;
    let assessment = state
        .assessment_service
        .create_assessment(payload, created_by)
        .await?;
    Ok((StatusCode::CREATED, Json(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Query(query): Query<ListAssessmentsQuery>,
) -> crate::error::Result<Response> {
    let filter = AssessmentFilter {
        kind: query.kind,
        is_active: query.is_active,
        search: query.search,
    };
    let listing = state
        .assessment_service
        .list_assessments(filter, query.page.unwrap_or(1), query.per_page.unwrap_or(20))
        .await?;
    Ok(Json(listing).into_response())
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let assessment = state.assessment_service.get_assessment(id).await?;
    Ok(Json(assessment).into_response())
}

#[axum::debug_handler]
pub async fn update_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let assessment = state
        .assessment_service
        .update_assessment(id, payload)
        .await?;
    Ok(Json(assessment).into_response())
}

#[axum::debug_handler]
pub async fn delete_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let deleted = state.assessment_service.delete_assessment(id).await?;
    if !deleted {
        return Err(crate::error::Error::NotFound(
            "assessment not found".to_string(),
        ));
    }
    Ok(Json(json!({ "deleted": true })).into_response())
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let attempts = state.assessment_service.list_attempts(id).await?;
    Ok(Json(attempts).into_response())
}
