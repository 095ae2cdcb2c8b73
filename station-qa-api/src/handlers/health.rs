use crate::models::HealthResponse;
use actix_web::{get, HttpResponse, Responder};

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "success".to_string(),
        message: "API Server is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
