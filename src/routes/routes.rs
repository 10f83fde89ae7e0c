use actix_web::{HttpResponse, error, web};

use crate::handlers::health_handlers::health_check;
use crate::handlers::visit_handlers::{
    get_current, get_visit_by_url, get_visit_history, index, purge_visits, submit_visit,
};

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Malformed bodies and query strings get the same JSON error shape as everything else
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        )
        .into()
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        )
        .into()
    }));

    cfg.route("/", web::get().to(index));
    cfg.route("/api/health/check", web::get().to(health_check));
    cfg.service(
        web::scope("/api/analytics")
            .route("", web::post().to(submit_visit))
            .route("/", web::post().to(submit_visit))
            .route("/current", web::get().to(get_current))
            .route("/history", web::get().to(get_visit_history))
            // Purge is a mutation, so it is only reachable through DELETE
            .route("/history", web::delete().to(purge_visits))
            .route("/url/{url:.*}", web::get().to(get_visit_by_url)),
    );
}
