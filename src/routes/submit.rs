use axum::{extract::State, http::StatusCode};
use intake_error::AppError;
use std::sync::Arc;

use super::extractors::{ClientIp, FormJson};
use crate::admission::Admission;
use crate::context::AppContext;
use crate::validation::SubmissionForm;

/// POST /api/submit-form
///
/// 200 with an empty body for a new submitter; a known submitter gets
/// 400 "User already exists" after its counters are updated.
pub async fn submit_form(
    State(ctx): State<Arc<AppContext>>,
    ClientIp(client_ip): ClientIp,
    FormJson(form): FormJson<SubmissionForm>,
) -> Result<StatusCode, AppError> {
    match ctx.admission.submit(form, &client_ip).await? {
        Admission::Accepted(_) => Ok(StatusCode::OK),
        Admission::Duplicate(_) => Err(AppError::Duplicate),
    }
}
