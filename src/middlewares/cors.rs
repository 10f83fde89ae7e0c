use actix_cors::Cors;
use actix_web::http;

/// CORS policy for the extension and dashboard.
///
/// Extension origins (`chrome-extension://<id>`) are not known in advance, so an
/// empty list accepts any origin.
pub fn cors_policy(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![http::header::ACCEPT])
        .allowed_header(http::header::CONTENT_TYPE)
        .max_age(3600)
}
