use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

/*
    /api/destination-image
*/
pub async fn destination_image(
    state: web::Data<AppState>,
    query: web::Query<ImageQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let country = query.country.as_deref().unwrap_or_default();
    match state.images.resolve(&query.name, country).await {
        Some(url) => Ok(HttpResponse::Ok().json(json!({ "url": url }))),
        None => Err(ApiError::NotFound("No image found".to_string())),
    }
}
