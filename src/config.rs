use std::env;
use std::time::Duration;

use crate::services::llm::openai::{DEFAULT_MODEL, OPENAI_API_BASE};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DEFAULT_DATABASE: &str = "TripPlanner";
const IMAGE_CACHE_TTL_SECS: u64 = 3600;
const PENDING_STATE_TTL_SECS: u64 = 1800;
const WIKIPEDIA_API_BASE: &str = "https://en.wikipedia.org";

/// Output token ceilings per generation mode. Road trips and detail plans
/// need more room than a plain list of summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationLimits {
    pub summary_max_tokens: u32,
    pub road_trip_summary_max_tokens: u32,
    pub detail_max_tokens: u32,
    pub road_trip_detail_max_tokens: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            summary_max_tokens: 6000,
            road_trip_summary_max_tokens: 10000,
            detail_max_tokens: 12000,
            road_trip_detail_max_tokens: 16000,
        }
    }
}

impl GenerationLimits {
    /// Create limits from environment variables or use defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            summary_max_tokens: env_parse("SUMMARY_MAX_TOKENS")
                .unwrap_or(defaults.summary_max_tokens),
            road_trip_summary_max_tokens: env_parse("ROAD_TRIP_SUMMARY_MAX_TOKENS")
                .unwrap_or(defaults.road_trip_summary_max_tokens),
            detail_max_tokens: env_parse("DETAIL_MAX_TOKENS")
                .unwrap_or(defaults.detail_max_tokens),
            road_trip_detail_max_tokens: env_parse("ROAD_TRIP_DETAIL_MAX_TOKENS")
                .unwrap_or(defaults.road_trip_detail_max_tokens),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub wikipedia_api_base: String,
    pub image_cache_ttl: Duration,
    pub pending_state_ttl: Duration,
    pub limits: GenerationLimits,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, using an insecure development secret");
            "default_secret".to_string()
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port: env_parse("PORT").unwrap_or(PORT),
            mongodb_uri: env::var("MONGODB_URI").ok().filter(|v| !v.is_empty()),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            jwt_secret,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_API_BASE.to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            wikipedia_api_base: env::var("WIKIPEDIA_API_BASE")
                .unwrap_or_else(|_| WIKIPEDIA_API_BASE.to_string()),
            image_cache_ttl: Duration::from_secs(
                env_parse("IMAGE_CACHE_TTL_SECS").unwrap_or(IMAGE_CACHE_TTL_SECS),
            ),
            pending_state_ttl: Duration::from_secs(
                env_parse("PENDING_STATE_TTL_SECS").unwrap_or(PENDING_STATE_TTL_SECS),
            ),
            limits: GenerationLimits::from_env(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
