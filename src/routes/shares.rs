use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::MaybeUser;
use crate::models::share::{NewSharedTrip, SharedTrip};
use crate::state::AppState;

/*
    /api/shares
*/
pub async fn create(
    user: MaybeUser,
    state: web::Data<AppState>,
    body: web::Json<NewSharedTrip>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner();
    let share = SharedTrip {
        id: Uuid::new_v4().to_string(),
        owner_id: user.0.map(|u| u.user_id),
        trip_input: input.trip_input.validate()?,
        destinations: input.destinations,
        selected_destination: input.selected_destination,
        created_at: Utc::now(),
    };
    let share = state.store.create_share(share).await?;
    Ok(HttpResponse::Created().json(share))
}

/*
    /api/shares/{id}
*/
pub async fn get(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let share = state.store.get_share(&path).await?;
    Ok(HttpResponse::Ok().json(share))
}
