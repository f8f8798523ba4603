use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::account::{Favorite, NewFavorite};
use crate::models::destination::DestinationKey;
use crate::state::AppState;

/*
    /api/favorites
*/
pub async fn list(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let favorites = state.store.list_favorites(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(favorites))
}

pub async fn add(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<NewFavorite>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner();
    if input.destination_name.trim().is_empty() {
        return Err(ApiError::BadRequest("destinationName is required".to_string()));
    }

    let favorite = Favorite {
        id: Uuid::new_v4().to_string(),
        user_id: user.user_id,
        destination_key: DestinationKey::new(&input.destination_name, &input.country).to_string(),
        destination_name: input.destination_name.trim().to_string(),
        country: input.country.trim().to_string(),
        data: input.data,
        trip_input: input.trip_input,
        created_at: Utc::now(),
    };
    let favorite = state.store.add_favorite(favorite).await?;
    info!("Favorite {} saved for {}", favorite.id, favorite.user_id);
    Ok(HttpResponse::Created().json(favorite))
}

/*
    /api/favorites/{id}
*/
pub async fn remove(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.store.remove_favorite(&user.user_id, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
