pub mod handlers;
pub mod types;

use actix_cors::Cors;
use actix_web::web;

/// Registers every route of the node.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::enrollment::resource())
        .service(handlers::health::resource());
}

/// Any origin may call any route.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}
