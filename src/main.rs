use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use trip_planner_api::config::AppConfig;
use trip_planner_api::db::{self, MemoryStore, MongoStore, PlannerStore};
use trip_planner_api::middleware::IdentityMiddleware;
use trip_planner_api::routes;
use trip_planner_api::services::image_lookup::ImageResolver;
use trip_planner_api::services::llm::{GenerationProvider, OpenAiProvider};
use trip_planner_api::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Application starting...");

    let config = AppConfig::from_env();

    let store: Arc<dyn PlannerStore> = match &config.mongodb_uri {
        Some(uri) => match db::mongo::create_mongo_client(uri).await {
            Ok(client) => Arc::new(MongoStore::new(&client, &config.mongodb_database)),
            Err(e) => {
                error!("Failed to create MongoDB client: {}", e);
                return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
            }
        },
        None => {
            warn!("MONGODB_URI not set, saved data will live in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set, searches will fail until it is configured");
    }
    let provider: Arc<dyn GenerationProvider> = Arc::new(
        OpenAiProvider::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
    );

    let images = ImageResolver::wikipedia(
        reqwest::Client::new(),
        &config.wikipedia_api_base,
        config.image_cache_ttl,
    );

    let state = web::Data::new(AppState::new(&config, store, provider, images));
    let jwt_secret = config.jwt_secret.clone();

    info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(IdentityMiddleware::new(jwt_secret.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
