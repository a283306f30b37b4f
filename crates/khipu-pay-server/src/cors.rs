use actix_cors::Cors;

/// CORS middleware. With no configured origins only `http://localhost[:port]`
/// is allowed.
pub fn build_cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allowed_origin_fn(|origin, _| {
            origin
                .to_str()
                .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                .unwrap_or(false)
        })
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .max_age(3600)
}
