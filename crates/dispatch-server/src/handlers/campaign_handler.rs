use super::{error_response, parse_id};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use dispatch_types::{CreateCampaignRequest, ResumeRequest, StartRequest};

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    state: web::Data<AppState>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    match state.control.create(body.into_inner()).await {
        Ok(campaign) => HttpResponse::Created().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns
pub async fn list_campaigns_endpoint(state: web::Data<AppState>) -> HttpResponse {
    match state.control.list().await {
        Ok(summaries) => HttpResponse::Ok().json(summaries),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.control.get(&id).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/start
pub async fn start_campaign_endpoint(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<StartRequest>,
) -> HttpResponse {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.control.start(&id, body.into_inner()).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/pause
pub async fn pause_campaign_endpoint(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.control.pause(&id).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/resume
///
/// The body is optional; a template in it replaces the campaign's.
pub async fn resume_campaign_endpoint(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<ResumeRequest>>,
) -> HttpResponse {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let request = body.map(|b| b.into_inner()).unwrap_or_default();

    match state.control.resume(&id, request).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/reset
pub async fn reset_campaign_endpoint(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.control.reset(&id).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}
