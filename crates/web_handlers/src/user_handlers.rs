use actix_web::{HttpResponse, Result, web};

use auth_services::middleware::AuthenticatedUser;
use campsite_services::service::AccountService;
use campsite_services::types::ProvisionAccountRequest;

use crate::error::{ApiError, validate_request};
use crate::path_id;

/// Creates the account of the authenticated user.
pub async fn provision_account(
    account_service: web::Data<AccountService>,
    user: AuthenticatedUser,
    request: web::Json<ProvisionAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_request(&*request, ProvisionAccountRequest::FIELDS)?;

    let account = account_service
        .provision(user.id, request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(account))
}

/// Gets the account of a user
pub async fn get_account(
    account_service: web::Data<AccountService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let account = account_service.get(path_id(&path)).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// Adds a signed XP delta to a user's account.
pub async fn update_xp(
    account_service: web::Data<AccountService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, xp) = path.into_inner();
    let account = account_service.add_xp(path_id(&user_id), &xp).await?;

    Ok(HttpResponse::Ok().json(account))
}

/// Lists a user's favourite campsites
pub async fn list_favourites(
    account_service: web::Data<AccountService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let campsites = account_service.favourites(path_id(&path)).await?;
    Ok(HttpResponse::Ok().json(campsites))
}

/// Adds a campsite to a user's favourites
pub async fn add_favourite(
    account_service: web::Data<AccountService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, campsite_id) = path.into_inner();
    account_service
        .add_favourite(path_id(&user_id), path_id(&campsite_id))
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Campsite added to favourites."
    })))
}

/// Removes a campsite from a user's favourites
pub async fn remove_favourite(
    account_service: web::Data<AccountService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, campsite_id) = path.into_inner();
    account_service
        .remove_favourite(path_id(&user_id), path_id(&campsite_id))
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
