#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App,
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trip_planner_api::config::AppConfig;
use trip_planner_api::db::MemoryStore;
use trip_planner_api::middleware::auth::{encode_token, Claims};
use trip_planner_api::middleware::IdentityMiddleware;
use trip_planner_api::routes;
use trip_planner_api::services::image_lookup::{ImageLookupError, ImageResolver, ImageSource};
use trip_planner_api::services::llm::{
    chunk_text, snapshot_stream, GenerationError, GenerationProvider, GenerationRequest,
    PartialObjectStream,
};
use trip_planner_api::services::ttl_cache::TtlCache;
use trip_planner_api::state::AppState;

pub const JWT_SECRET: &str = "test_secret";

/// Replays canned model output, one small delta at a time.
pub struct ScriptedProvider {
    pub summary_output: String,
    pub detail_output: String,
    pub summary_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub failure: Mutex<Option<GenerationError>>,
    pub chunk_delay: Duration,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            summary_output: summary_output().to_string(),
            detail_output: porto_detail_output().to_string(),
            summary_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            chunk_delay: Duration::from_millis(1),
        }
    }

    pub fn failing(err: GenerationError) -> Self {
        let provider = Self::new();
        *provider.failure.lock().unwrap() = Some(err);
        provider
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<PartialObjectStream, GenerationError> {
        let text = if request.schema_name == "exploration_summary" {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            self.summary_output.clone()
        } else {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            self.detail_output.clone()
        };

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let delay = self.chunk_delay;
        let deltas = stream::iter(chunk_text(&text, 24).into_iter().map(Ok::<String, GenerationError>)).then(
            move |delta| async move {
                tokio::time::sleep(delay).await;
                delta
            },
        );
        Ok(snapshot_stream(deltas))
    }
}

/// Image source with a fixed answer.
pub struct FixedImageSource(pub Vec<&'static str>);

#[async_trait]
impl ImageSource for FixedImageSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn candidates(
        &self,
        _name: &str,
        _country: &str,
    ) -> Result<Vec<String>, ImageLookupError> {
        Ok(self.0.iter().map(|u| u.to_string()).collect())
    }
}

pub struct TestApp {
    pub state: web::Data<AppState>,
    pub provider: Arc<ScriptedProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(ScriptedProvider::new())
    }

    pub fn with_provider(provider: ScriptedProvider) -> Self {
        Self::with_parts(
            provider,
            vec![Arc::new(FixedImageSource(vec![
                "https://upload.wikimedia.org/Ribeira_Porto.jpg",
            ])) as Arc<dyn ImageSource>],
        )
    }

    pub fn with_parts(provider: ScriptedProvider, image_sources: Vec<Arc<dyn ImageSource>>) -> Self {
        Self::build(provider, image_sources, Some("test-key".to_string()))
    }

    /// App started without a provider API key.
    pub fn without_credentials() -> Self {
        Self::build(
            ScriptedProvider::new(),
            vec![Arc::new(FixedImageSource(vec![])) as Arc<dyn ImageSource>],
            None,
        )
    }

    fn build(
        provider: ScriptedProvider,
        image_sources: Vec<Arc<dyn ImageSource>>,
        openai_api_key: Option<String>,
    ) -> Self {
        let mut config = AppConfig::from_env();
        config.jwt_secret = JWT_SECRET.to_string();
        config.openai_api_key = openai_api_key;

        let provider = Arc::new(provider);
        let images = ImageResolver::new(image_sources, TtlCache::new(Duration::from_secs(3600)));
        let state = web::Data::new(AppState::new(
            &config,
            Arc::new(MemoryStore::new()),
            provider.clone(),
            images,
        ));

        Self { state, provider }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(IdentityMiddleware::new(JWT_SECRET))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(self.state.clone())
            .configure(routes::configure)
    }
}

pub fn bearer(user_id: &str) -> (&'static str, String) {
    let claims = Claims::new(user_id, &format!("{}@example.com", user_id), 3600);
    let token = encode_token(&claims, JWT_SECRET).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

pub fn london_trip() -> Value {
    json!({
        "homeCity": "London",
        "dates": { "flexible": false, "startDate": "2026-04-10", "endDate": "2026-04-17" },
        "travelers": 2,
        "interests": ["Hiking"],
        "budgetLevel": "moderate",
        "tripStyle": "mixed",
        "locationPreference": { "type": "open" }
    })
}

pub fn summary_output() -> Value {
    json!({
        "summary": "Three spring options within easy reach of London",
        "destinations": [
            {
                "name": "Picos de Europa",
                "country": "Spain",
                "coordinates": { "lat": 43.2, "lng": -4.85 },
                "reasoning": "Dramatic limestone trails",
                "matchScore": 94,
                "estimatedDailyCost": 110,
                "topActivities": ["Cares Gorge", "Fuente Dé cable car"],
                "suggestedDuration": "5-7 days"
            },
            {
                "name": "Dolomites",
                "country": "Italy",
                "coordinates": { "lat": 46.41, "lng": 11.84 },
                "reasoning": "Hut-to-hut hiking",
                "matchScore": 88,
                "estimatedDailyCost": 140,
                "suggestedDuration": "7 days"
            },
            {
                "name": "Porto",
                "country": "Portugal",
                "coordinates": { "lat": 41.15, "lng": -8.61 },
                "reasoning": "Coastal walks and the Douro",
                "matchScore": 81,
                "estimatedDailyCost": 90,
                "suggestedDuration": "4 days"
            }
        ],
        "weatherComparison": [],
        "recommendedDestination": "Picos de Europa"
    })
}

pub fn porto_detail_output() -> Value {
    json!({
        "name": "Porto",
        "country": "Portugal",
        "matchScore": 86,
        "estimatedDailyCost": 90,
        "pros": ["Food", "River views"],
        "cons": ["Hilly streets"],
        "itinerary": [
            { "day": 1, "location": "Ribeira", "coordinates": { "lat": 41.14, "lng": -8.61 }, "highlights": ["Port cellars"] },
            { "day": 2, "location": "Douro Valley", "coordinates": { "lat": 41.16, "lng": -7.79 }, "highlights": ["Vineyard walk"] }
        ],
        "totalTripCost": 1400
    })
}

/// Split an NDJSON body into parsed frames.
pub fn ndjson_frames(body: &[u8]) -> Vec<Value> {
    body.split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect()
}
