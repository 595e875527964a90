use actix_web::{web, HttpResponse};
use dispatch_core::services::analyze;
use dispatch_types::AnalyzeVariationsRequest;

/// POST /api/variations/analyze
pub async fn analyze_endpoint(body: web::Json<AnalyzeVariationsRequest>) -> HttpResponse {
    let analysis = analyze(&body.text);
    log::debug!("Analyzed {} variation slot(s), {} combination(s)", analysis.slots.len(), analysis.count);
    HttpResponse::Ok().json(analysis)
}
