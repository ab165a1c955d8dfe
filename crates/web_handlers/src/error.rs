use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header::WWW_AUTHENTICATE},
};
use serde::Serialize;
use serde_json::{Value, json};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use auth_services::types::AuthError;
use campsite_services::types::CampsiteError;

/// One entry of a 422 response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDetail {
    /// Where the problem is, starting with `"body"`
    pub loc: Vec<Value>,
    /// Capitalized field name followed by the rule's message
    pub msg: String,
}

/// Error type returned by every handler; decides the HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Registration, login and token failures
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Campsite, review and account failures
    #[error(transparent)]
    Campsite(#[from] CampsiteError),

    /// Request body or query failed validation or could not be parsed
    #[error("Request validation failed")]
    Unprocessable(Vec<ValidationDetail>),
}

impl ApiError {
    /// Wraps a body that could not be deserialized.
    pub fn malformed(location: &str, message: impl Into<String>) -> Self {
        ApiError::Unprocessable(vec![ValidationDetail {
            loc: vec![json!(location)],
            msg: message.into(),
        }])
    }

    fn internal(&self) -> HttpResponse {
        log::debug!("Internal error: {:?}", self);
        HttpResponse::InternalServerError().json(json!({ "detail": "A server error occurred" }))
    }
}

/// Runs the request's validation rules, reporting fields in the order given.
pub fn validate_request<T: Validate>(request: &T, fields: &[&str]) -> Result<(), ApiError> {
    request
        .validate()
        .map_err(|errors| ApiError::Unprocessable(validation_details(&errors, fields)))
}

/// Flattens `errors` into response entries, top-level fields ordered by `fields`.
pub fn validation_details(errors: &ValidationErrors, fields: &[&str]) -> Vec<ValidationDetail> {
    let mut details = Vec::new();
    collect_details(errors, fields, &mut vec![json!("body")], &mut details);
    details
}

fn collect_details(
    errors: &ValidationErrors,
    fields: &[&str],
    loc: &mut Vec<Value>,
    details: &mut Vec<ValidationDetail>,
) {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by_key(|(field, _)| {
        let name: &str = field;
        let rank = fields
            .iter()
            .position(|f| *f == name)
            .unwrap_or(fields.len());
        (rank, name.to_string())
    });

    for (field, kind) in entries {
        loc.push(json!(field));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_deref()
                        .unwrap_or(error.code.as_ref());
                    details.push(ValidationDetail {
                        loc: loc.clone(),
                        msg: format!("{} {}", capitalize(field), message),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_details(nested, &[], loc, details),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    loc.push(json!(index));
                    collect_details(nested, &[], loc, details);
                    loc.pop();
                }
            }
        }
        loc.pop();
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn detail(status: StatusCode, message: String) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "detail": message }))
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::DuplicateUsername => StatusCode::CONFLICT,
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
                AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Campsite(e) => match e {
                CampsiteError::CampsiteNotFound
                | CampsiteError::ReviewNotFound
                | CampsiteError::AccountNotFound
                | CampsiteError::CampsiteOwnerNotFound
                | CampsiteError::ReviewerNotFound
                | CampsiteError::FavouriteNotFound => StatusCode::NOT_FOUND,
                CampsiteError::AccountExists | CampsiteError::FavouriteExists => {
                    StatusCode::CONFLICT
                }
                CampsiteError::InvalidXp => StatusCode::BAD_REQUEST,
                CampsiteError::CategoryNotFound | CampsiteError::Validation(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CampsiteError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => self.internal(),
            ApiError::Auth(AuthError::Validation(errors))
            | ApiError::Campsite(CampsiteError::Validation(errors)) => {
                HttpResponse::UnprocessableEntity()
                    .json(json!({ "detail": validation_details(errors, &[]) }))
            }
            ApiError::Unprocessable(details) => {
                HttpResponse::UnprocessableEntity().json(json!({ "detail": details }))
            }
            ApiError::Auth(e) if status == StatusCode::UNAUTHORIZED => {
                HttpResponse::Unauthorized()
                    .insert_header((WWW_AUTHENTICATE, "Bearer"))
                    .json(json!({ "detail": e.to_string() }))
            }
            _ => detail(status, self.to_string()),
        }
    }
}
