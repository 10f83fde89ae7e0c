use actix_web::{HttpResponse, Result, web};
use log::error;
use validator::Validate;

use crate::errors::VisitError;
use crate::state::app_state::AppState;
use crate::structs::visit_request::{HistoryParams, PurgeResponse, VisitRequest};

/// Create a new visit record or merge into the existing one for the URL
pub async fn submit_visit(
    app_state: web::Data<AppState>,
    web::Json(req): web::Json<VisitRequest>,
) -> Result<HttpResponse, VisitError> {
    if let Err(errors) = req.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let record = app_state
        .aggregator
        .submit_visit(&req.url, req.metrics())
        .await
        .inspect_err(|e| error!("[{}] Error creating/updating visit for {}: {}", e.code(), req.url, e))?;

    Ok(HttpResponse::Ok().json(record))
}

/// Metrics for the most recently visited page, or `null` before any visit
pub async fn get_current(app_state: web::Data<AppState>) -> Result<HttpResponse, VisitError> {
    let current = app_state
        .aggregator
        .current()
        .await
        .inspect_err(|e| error!("[{}] Error retrieving current metrics: {}", e.code(), e))?;

    Ok(HttpResponse::Ok().json(current))
}

pub async fn get_visit_by_url(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, VisitError> {
    let url = path.into_inner();
    let record = app_state.aggregator.by_url(&url).await?;

    Ok(HttpResponse::Ok().json(record))
}

pub async fn get_visit_history(
    app_state: web::Data<AppState>,
    query: web::Query<HistoryParams>,
) -> Result<HttpResponse, VisitError> {
    let records = app_state
        .aggregator
        .history(query.skip, query.limit)
        .await
        .inspect_err(|e| error!("[{}] Error retrieving visit history: {}", e.code(), e))?;

    Ok(HttpResponse::Ok().json(records))
}

/// Delete every visit record
pub async fn purge_visits(app_state: web::Data<AppState>) -> Result<HttpResponse, VisitError> {
    let deleted = app_state.aggregator.purge().await?;

    Ok(HttpResponse::Ok().json(PurgeResponse { deleted }))
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Welcome to the page analytics API!"
    }))
}
