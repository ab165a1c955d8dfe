use actix_web::{HttpResponse, Result, web};

use auth_services::middleware::AuthenticatedUser;
use campsite_services::service::CampsiteService;
use campsite_services::types::{CreateCampsiteRequest, ListCampsitesQuery};

use crate::error::{ApiError, validate_request};
use crate::path_id;

/// Lists campsite categories.
pub async fn list_categories(
    campsite_service: web::Data<CampsiteService>,
) -> Result<HttpResponse, ApiError> {
    let categories = campsite_service.categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// Lists campsites with their category, photos and contacts.
pub async fn list_campsites(
    campsite_service: web::Data<CampsiteService>,
    query: web::Query<ListCampsitesQuery>,
) -> Result<HttpResponse, ApiError> {
    let campsites = campsite_service.list(&query).await?;
    Ok(HttpResponse::Ok().json(campsites))
}

/// Creates a campsite for the authenticated user
pub async fn create_campsite(
    campsite_service: web::Data<CampsiteService>,
    user: AuthenticatedUser,
    request: web::Json<CreateCampsiteRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_request(&*request, CreateCampsiteRequest::FIELDS)?;

    log::debug!("{} is adding campsite {:?}", user.username, request.campsite_name);
    let campsite = campsite_service.create(&request).await?;

    Ok(HttpResponse::Created().json(campsite))
}

/// Gets a campsite by id, including the username of whoever added it.
pub async fn get_campsite(
    campsite_service: web::Data<CampsiteService>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let campsite = campsite_service.get(path_id(&path)).await?;
    Ok(HttpResponse::Ok().json(campsite))
}
