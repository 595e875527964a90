pub mod campaign_handler;
pub mod dispatch_handler;
pub mod health_handler;
pub mod variation_handler;

use actix_web::HttpResponse;
use dispatch_core::{CampaignId, DispatchError};
use serde_json::json;

/// Map an engine error onto a status code and the `{success, error}` body
pub fn error_response(err: &DispatchError) -> HttpResponse {
    let body = json!({
        "success": false,
        "error": err.to_string()
    });

    match err {
        DispatchError::NotFound(_) => HttpResponse::NotFound().json(body),
        DispatchError::InvalidTransition(_) | DispatchError::Conflict(_) => HttpResponse::Conflict().json(body),
        DispatchError::Config(_) => HttpResponse::BadRequest().json(body),
        _ if err.is_client_error() => HttpResponse::BadRequest().json(body),
        _ => {
            log::error!("Request failed: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<CampaignId, DispatchError> {
    CampaignId::from_string(raw).map_err(DispatchError::InvalidRequest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DispatchError::NotFound("c1".into()), StatusCode::NOT_FOUND),
            (DispatchError::Conflict("stale".into()), StatusCode::CONFLICT),
            (DispatchError::InvalidTransition("draft".into()), StatusCode::CONFLICT),
            (DispatchError::InvalidRequest("bad id".into()), StatusCode::BAD_REQUEST),
            (DispatchError::Config("no keys".into()), StatusCode::BAD_REQUEST),
            (DispatchError::Delivery("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status, "{}", err);
        }
    }
}
