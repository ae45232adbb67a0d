//! HTTP handler functions for the case tracker API.

use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, web};
use case_tracker_case_models::keys::is_cached_key;
use case_tracker_refresh::RefreshRequest;
use case_tracker_server_models::{ApiError, ApiHealth};
use case_tracker_store::KvStore;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET|POST /api/refresh`
///
/// Flags are read from the raw query string: `debug`, `only=cases`,
/// `only=hospitals`. Failures are returned with the upstream status, or
/// 500.
pub async fn refresh(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let request = RefreshRequest::from_query(req.query_string());

    match state.refreshers.refresh_official_sources(request).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            log::error!("Refresh failed: {e}");
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status).json(e.to_error_body())
        }
    }
}

/// `GET /api/cached/{key}`
///
/// Serves a cached entry exactly as stored. Keys outside the `cached_`
/// namespace are treated as absent.
pub async fn cached(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let key = path.into_inner();
    if !is_cached_key(&key) {
        return not_found();
    }

    match state.store.get(&key).await {
        Ok(Some(body)) => HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(body),
        Ok(None) => not_found(),
        Err(e) => {
            log::error!("Failed to read {key}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(500, "Store error"))
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new(404, "Not Found"))
}
