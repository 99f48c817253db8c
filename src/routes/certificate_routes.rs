use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::submission_dto::CertificateVerification;
use crate::AppState;

/// Public lookup so anyone holding a code can check the credential.
#[axum::debug_handler]
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> crate::error::Result<Response> {
    let certificate = state.certificate_service.verify(&code).await?;
    Ok(Json(CertificateVerification::from(certificate)).into_response())
}
