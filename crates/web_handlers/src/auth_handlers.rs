use actix_web::{HttpResponse, Result, web};

use auth_services::service::AuthService;
use auth_services::types::{LoginRequest, RegisterRequest};

use crate::error::{ApiError, validate_request};

const REGISTERED_MESSAGE: &str = "User created successfully, please log in to continue.";

/// Handles user registration by validating the request and storing the new
/// credential. Returns 201 Created; the client logs in separately.
pub async fn register(
    auth_service: web::Data<AuthService>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_request(&*request, RegisterRequest::FIELDS)?;

    let user = auth_service.register(&request).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": REGISTERED_MESSAGE,
        "username": user.username,
        "user_id": user.user_id,
    })))
}

/// Handles login from a form-encoded body and returns a bearer token.
pub async fn login(
    auth_service: web::Data<AuthService>,
    form: web::Form<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let token = auth_service.login(&form.username, &form.password).await?;

    Ok(HttpResponse::Ok().json(token))
}
