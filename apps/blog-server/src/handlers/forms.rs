//! Form input helpers shared by the page and admin handlers.

use actix_web::{Either, web};
use blog_shared::response::field_errors;
use validator::Validate;

use crate::middleware::error::{AppError, AppResult};

/// Body accepted either as `application/x-www-form-urlencoded` or as JSON.
pub type FormOrJson<T> = Either<web::Form<T>, web::Json<T>>;

pub fn into_inner<T>(body: FormOrJson<T>) -> T {
    match body {
        Either::Left(form) => form.into_inner(),
        Either::Right(json) => json.into_inner(),
    }
}

/// Run the input's validation rules, mapping failures to field errors.
pub fn validate<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::validation(field_errors(&e)))
}
