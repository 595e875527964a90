//! Route table
use crate::handlers::{campaign_handler, dispatch_handler, health_handler, variation_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_handler::health_endpoint))
            .service(
                web::scope("/campaigns")
                    .route("", web::post().to(campaign_handler::create_campaign_endpoint))
                    .route("", web::get().to(campaign_handler::list_campaigns_endpoint))
                    .route("/{id}", web::get().to(campaign_handler::get_campaign_endpoint))
                    .route("/{id}/start", web::post().to(campaign_handler::start_campaign_endpoint))
                    .route("/{id}/pause", web::post().to(campaign_handler::pause_campaign_endpoint))
                    .route("/{id}/resume", web::post().to(campaign_handler::resume_campaign_endpoint))
                    .route("/{id}/reset", web::post().to(campaign_handler::reset_campaign_endpoint)),
            )
            .service(
                web::scope("/dispatch")
                    .route("/process", web::post().to(dispatch_handler::process_endpoint))
                    .route("/turbo", web::post().to(dispatch_handler::turbo_endpoint))
                    .route("/worker", web::post().to(dispatch_handler::worker_endpoint)),
            )
            .service(
                web::scope("/variations")
                    .route("/analyze", web::post().to(variation_handler::analyze_endpoint)),
            ),
    );
}
