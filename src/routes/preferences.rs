use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::account::UserPreferences;
use crate::state::AppState;

/*
    /api/preferences
*/
pub async fn get(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let preferences = state
        .store
        .get_preferences(&user.user_id)
        .await?
        .unwrap_or_else(|| UserPreferences {
            user_id: user.user_id.clone(),
            ..Default::default()
        });
    Ok(HttpResponse::Ok().json(preferences))
}

pub async fn put(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<UserPreferences>,
) -> Result<HttpResponse, ApiError> {
    let mut preferences = body.into_inner();
    preferences.user_id = user.user_id;
    preferences.home_city = preferences.home_city.filter(|c| !c.trim().is_empty());
    preferences.updated_at = Some(Utc::now());

    let preferences = state.store.put_preferences(preferences).await?;
    Ok(HttpResponse::Ok().json(preferences))
}
