use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::account::{NewWishlist, NewWishlistItem, Wishlist, WishlistItem, WishlistPatch};
use crate::models::destination::DestinationKey;
use crate::state::AppState;

fn required_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    Ok(name.to_string())
}

/*
    /api/wishlists
*/
pub async fn list(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let wishlists = state.store.list_wishlists(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(wishlists))
}

pub async fn create(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<NewWishlist>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner();
    let now = Utc::now();
    let wishlist = Wishlist {
        id: Uuid::new_v4().to_string(),
        user_id: user.user_id,
        name: required_name(&input.name)?,
        description: input.description.filter(|d| !d.trim().is_empty()),
        items: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    let wishlist = state.store.create_wishlist(wishlist).await?;
    Ok(HttpResponse::Created().json(wishlist))
}

/*
    /api/wishlists/{id}
*/
pub async fn get(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let wishlist = state.store.get_wishlist(&user.user_id, &path).await?;
    Ok(HttpResponse::Ok().json(wishlist))
}

pub async fn update(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<WishlistPatch>,
) -> Result<HttpResponse, ApiError> {
    let patch = body.into_inner();
    let mut wishlist = state.store.get_wishlist(&user.user_id, &path).await?;

    if let Some(name) = patch.name {
        wishlist.name = required_name(&name)?;
    }
    if let Some(description) = patch.description {
        wishlist.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    wishlist.updated_at = Utc::now();

    let wishlist = state.store.save_wishlist(wishlist).await?;
    Ok(HttpResponse::Ok().json(wishlist))
}

pub async fn delete(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.store.delete_wishlist(&user.user_id, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/*
    /api/wishlists/{id}/items
*/
pub async fn add_item(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewWishlistItem>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner();
    let destination_name = required_name(&input.destination_name)?;
    let mut wishlist = state.store.get_wishlist(&user.user_id, &path).await?;

    let key = DestinationKey::new(&destination_name, &input.country);
    if wishlist
        .items
        .iter()
        .any(|item| DestinationKey::new(&item.destination_name, &item.country) == key)
    {
        return Err(ApiError::Conflict(format!(
            "{} is already on this wishlist",
            destination_name
        )));
    }

    let now = Utc::now();
    wishlist.items.push(WishlistItem {
        id: Uuid::new_v4().to_string(),
        destination_name,
        country: input.country.trim().to_string(),
        data: input.data,
        note: input.note.filter(|n| !n.trim().is_empty()),
        added_at: now,
    });
    wishlist.updated_at = now;

    let wishlist = state.store.save_wishlist(wishlist).await?;
    Ok(HttpResponse::Created().json(wishlist))
}

/*
    /api/wishlists/{id}/items/{item_id}
*/
pub async fn remove_item(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (wishlist_id, item_id) = path.into_inner();
    let mut wishlist = state.store.get_wishlist(&user.user_id, &wishlist_id).await?;

    let before = wishlist.items.len();
    wishlist.items.retain(|item| item.id != item_id);
    if wishlist.items.len() == before {
        return Err(ApiError::not_found("Wishlist item"));
    }
    wishlist.updated_at = Utc::now();

    let wishlist = state.store.save_wishlist(wishlist).await?;
    Ok(HttpResponse::Ok().json(wishlist))
}
