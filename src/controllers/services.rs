use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::debug;

use crate::state::AppState;

// Every service with its latest results, in configuration order
pub async fn get_all_services(data: web::Data<AppState>) -> impl Responder {
    let services = data.registry.snapshot().await;
    debug!("Returning {} services", services.len());

    HttpResponse::Ok().json(services)
}

// Last status code of each service, keyed by name
pub async fn get_statuses(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.registry.statuses().await)
}

// Services flagged as own
pub async fn get_own_services(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.registry.own().await)
}

pub async fn get_service(
    data: web::Data<AppState>,
    service_name: web::Path<String>,
) -> impl Responder {
    let name = service_name.into_inner();

    match data.registry.get(&name).await {
        Some(service) => HttpResponse::Ok().json(service),
        None => HttpResponse::NotFound().json(json!({
            "error": format!("Service not found: {}", name)
        })),
    }
}
