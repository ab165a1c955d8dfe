use actix_web::{HttpResponse, Result, web};

use auth_services::middleware::AuthenticatedUser;
use campsite_services::service::ReviewService;
use campsite_services::types::{CreateReviewRequest, UpdateReviewRequest};

use crate::error::{ApiError, validate_request};
use crate::path_id;

/// Lists the reviews of a campsite
pub async fn list_reviews(
    review_service: web::Data<ReviewService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let reviews = review_service.list(path_id(&path)).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// Posts a review on a campsite
pub async fn create_review(
    review_service: web::Data<ReviewService>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_request(&*request, CreateReviewRequest::FIELDS)?;

    let review = review_service.create(path_id(&path), &request).await?;
    Ok(HttpResponse::Created().json(review))
}

/// Updates the rating and/or comment of a review
pub async fn update_review(
    review_service: web::Data<ReviewService>,
    _user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_request(&*request, UpdateReviewRequest::FIELDS)?;

    let (campsite_id, review_id) = path.into_inner();
    let review = review_service
        .update(path_id(&campsite_id), path_id(&review_id), &request)
        .await?;

    Ok(HttpResponse::Ok().json(review))
}

/// Deletes a review. The campsite segment of the path is not consulted.
pub async fn delete_campsite_review(
    review_service: web::Data<ReviewService>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (_, review_id) = path.into_inner();
    delete(&review_service, &user, &review_id).await
}

/// Deletes a review by id
pub async fn delete_review(
    review_service: web::Data<ReviewService>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    delete(&review_service, &user, &path).await
}

async fn delete(
    review_service: &ReviewService,
    user: &AuthenticatedUser,
    review_id: &str,
) -> Result<HttpResponse, ApiError> {
    review_service.delete(path_id(review_id)).await?;

    log::debug!("Review {} deleted by {}", review_id, user.username);
    Ok(HttpResponse::NoContent().finish())
}
