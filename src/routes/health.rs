use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

/*
    /health
*/
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let store_result = check_store(&state).await;
    health
        .services
        .insert(state.store.backend_name().to_string(), store_result.clone());

    let generation_result = check_generation(&state);
    health
        .services
        .insert("generation".to_string(), generation_result.clone());

    if store_result.status != "ok" || generation_result.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_store(state: &AppState) -> ServiceStatus {
    match state.store.ping().await {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: None,
        },
        Err(e) => ServiceStatus {
            status: "error".to_string(),
            details: Some(e.to_string()),
        },
    }
}

fn check_generation(state: &AppState) -> ServiceStatus {
    if state.generation_configured {
        ServiceStatus {
            status: "ok".to_string(),
            details: None,
        }
    } else {
        ServiceStatus {
            status: "error".to_string(),
            details: Some("No provider credential configured".to_string()),
        }
    }
}
