use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::services::pending_state::PendingState;
use crate::state::AppState;

/*
    /api/sessions/{session_id}/pending
*/
pub async fn load(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state
        .pending
        .load(&path)
        .map(|pending| HttpResponse::Ok().json(pending))
        .ok_or_else(|| ApiError::not_found("Pending state"))
}

pub async fn save(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PendingState>,
) -> Result<HttpResponse, ApiError> {
    let pending = body.into_inner();
    pending.trip_input.clone().validate()?;
    state.pending.save(&path, pending);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn clear(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    state.pending.clear(&path);
    HttpResponse::NoContent().finish()
}
