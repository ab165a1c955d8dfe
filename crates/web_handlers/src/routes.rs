use actix_web::web;

use auth_services::jwt::JwtService;
use auth_services::middleware::AuthMiddleware;
use auth_services::service::AuthService;
use campsite_services::service::{AccountService, CampsiteService, ReviewService, Services};

use crate::error::ApiError;
use crate::*;

/// Services shared by every worker, registered as app data.
#[derive(Clone)]
pub struct AppData {
    auth: web::Data<AuthService>,
    jwt: web::Data<JwtService>,
    campsites: web::Data<CampsiteService>,
    reviews: web::Data<ReviewService>,
    accounts: web::Data<AccountService>,
}

impl AppData {
    /// Wraps the services for sharing across workers.
    pub fn new(auth: AuthService, services: Services) -> Self {
        let jwt = web::Data::new(auth.jwt_service().clone());

        Self {
            auth: web::Data::new(auth),
            jwt,
            campsites: web::Data::new(services.campsites),
            reviews: web::Data::new(services.reviews),
            accounts: web::Data::new(services.accounts),
        }
    }
}

/// Body, form and query parsing failures become 422 responses.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::malformed("body", err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| ApiError::malformed("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::malformed("query", err.to_string()).into()),
    );
}

/// Registers every route of the API.
pub fn configure_routes(cfg: &mut web::ServiceConfig, data: &AppData) {
    extractor_configs(cfg);

    cfg.app_data(data.auth.clone())
        .app_data(data.jwt.clone())
        .app_data(data.campsites.clone())
        .app_data(data.reviews.clone())
        .app_data(data.accounts.clone())
        // Public routes
        .route("/", web::get().to(health))
        .route("/categories", web::get().to(list_categories))
        .service(
            web::scope("/auth")
                .route("", web::post().to(register))
                .route("/token", web::post().to(login)),
        )
        // Campsites and reviews; handlers taking AuthenticatedUser require a token
        .service(
            web::scope("/campsites")
                .route("", web::get().to(list_campsites))
                .route("", web::post().to(create_campsite))
                .route("/{campsite_id}", web::get().to(get_campsite))
                .route("/{campsite_id}/reviews", web::get().to(list_reviews))
                .route("/{campsite_id}/reviews", web::post().to(create_review))
                .route(
                    "/{campsite_id}/reviews/{review_id}",
                    web::patch().to(update_review),
                )
                .route(
                    "/{campsite_id}/reviews/{review_id}",
                    web::delete().to(delete_campsite_review),
                ),
        )
        .route("/reviews/{review_id}", web::delete().to(delete_review))
        // Protected routes (require authentication)
        .service(
            web::scope("/users")
                .wrap(AuthMiddleware::new(data.jwt.get_ref().clone()))
                .route("", web::post().to(provision_account))
                .route("/{user_id}", web::get().to(get_account))
                .route("/{user_id}/favourites", web::get().to(list_favourites))
                .route(
                    "/{user_id}/favourites/{campsite_id}",
                    web::post().to(add_favourite),
                )
                .route(
                    "/{user_id}/favourites/{campsite_id}",
                    web::delete().to(remove_favourite),
                )
                .route("/{user_id}/{xp}", web::patch().to(update_xp)),
        );
}
