use actix_web::{HttpResponse, Result};

/// Health check endpoint
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "Server": "Healthy and happy!"
    })))
}
