use super::{error_response, parse_id};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use dispatch_types::{ProcessRequest, TurboRequest, WorkerRequest};
use serde_json::json;

/// POST /api/dispatch/process
pub async fn process_endpoint(state: web::Data<AppState>, body: web::Json<ProcessRequest>) -> HttpResponse {
    let id = match parse_id(&body.campaign_id) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.processor.process(&id, body.turbo).await {
        Ok(step) => HttpResponse::Ok().json(step),
        Err(e) => error_response(&e),
    }
}

/// POST /api/dispatch/turbo
pub async fn turbo_endpoint(state: web::Data<AppState>, body: web::Json<TurboRequest>) -> HttpResponse {
    let id = match parse_id(&body.campaign_id) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.turbo.dispatch_batch(&id).await {
        Ok(batch) => HttpResponse::Ok().json(batch),
        Err(e) => error_response(&e),
    }
}

/// POST /api/dispatch/worker
///
/// Detached requests are acknowledged with 202 and run in the background;
/// this is how one hop hands off to the next.
pub async fn worker_endpoint(state: web::Data<AppState>, body: web::Json<WorkerRequest>) -> HttpResponse {
    let request = body.into_inner();

    if !request.detached {
        return match state.worker.run(&request).await {
            Ok(summary) => HttpResponse::Ok().json(summary),
            Err(e) => error_response(&e),
        };
    }

    if let Err(e) = parse_id(&request.campaign_id) {
        return error_response(&e);
    }

    let worker = state.worker.clone();
    let campaign_id = request.campaign_id.clone();
    actix_web::rt::spawn(async move {
        match worker.run(&request).await {
            Ok(summary) => log::debug!(
                "Detached worker for campaign {} finished: {} processed, {:?}",
                request.campaign_id,
                summary.processed,
                summary.continuation
            ),
            Err(e) => log::error!("Detached worker for campaign {} failed: {}", request.campaign_id, e),
        }
    });

    HttpResponse::Accepted().json(json!({
        "success": true,
        "campaignId": campaign_id,
        "message": "Worker started"
    }))
}
