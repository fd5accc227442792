pub mod health;
pub mod services;

use actix_web::web;

/// Register every read-only route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .route("/all", web::get().to(services::get_all_services))
                .route("/status", web::get().to(services::get_statuses))
                .route("/own", web::get().to(services::get_own_services))
                .route("/services/{name}", web::get().to(services::get_service)),
        );
}
