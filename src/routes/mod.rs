pub mod favorites;
pub mod health;
pub mod images;
pub mod pending;
pub mod preferences;
pub mod search;
pub mod shares;
pub mod stream;
pub mod wishlists;

use actix_web::web;

use crate::error::ApiError;

/// Register every route. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health_check))
    .service(
        web::scope("/api")
            .route("/search", web::post().to(search::start_search))
            .route("/search/{session_id}/results", web::get().to(search::results))
            .route(
                "/search/{session_id}/destinations/{name}",
                web::get().to(search::destination),
            )
            .route(
                "/search/{session_id}/destinations/{name}/detail",
                web::post().to(search::stream_detail),
            )
            .route("/destination-image", web::get().to(images::destination_image))
            .service(
                web::resource("/sessions/{session_id}/pending")
                    .route(web::get().to(pending::load))
                    .route(web::put().to(pending::save))
                    .route(web::delete().to(pending::clear)),
            )
            .service(
                web::resource("/favorites")
                    .route(web::get().to(favorites::list))
                    .route(web::post().to(favorites::add)),
            )
            .route("/favorites/{id}", web::delete().to(favorites::remove))
            .service(
                web::resource("/wishlists")
                    .route(web::get().to(wishlists::list))
                    .route(web::post().to(wishlists::create)),
            )
            .service(
                web::resource("/wishlists/{id}")
                    .route(web::get().to(wishlists::get))
                    .route(web::patch().to(wishlists::update))
                    .route(web::delete().to(wishlists::delete)),
            )
            .route("/wishlists/{id}/items", web::post().to(wishlists::add_item))
            .route(
                "/wishlists/{id}/items/{item_id}",
                web::delete().to(wishlists::remove_item),
            )
            .route("/shares", web::post().to(shares::create))
            .route("/shares/{id}", web::get().to(shares::get))
            .service(
                web::resource("/preferences")
                    .route(web::get().to(preferences::get))
                    .route(web::put().to(preferences::put)),
            ),
    );
}
