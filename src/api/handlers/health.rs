use actix_web::{web, HttpResponse, Resource};

use crate::api::types::HealthResponse;

pub fn resource() -> Resource {
    web::resource("/health").route(web::get().to(health))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
