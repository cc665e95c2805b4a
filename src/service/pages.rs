use actix_web::HttpResponse;

use crate::error::ApiError;
use crate::structs::respond::HealthResponse;

pub(crate) async fn index() -> &'static str {
    "Math Evaluation API is running."
}

pub(crate) async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: "Math Evaluation API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}
