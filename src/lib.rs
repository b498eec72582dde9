pub mod auth;
pub mod booking;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod sms;
pub mod state;
pub mod sweep;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::ApiError;

/// Malformed JSON bodies (bad syntax, missing or unknown fields) get the
/// standard error envelope instead of actix's plain-text default.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("요청 본문이 올바르지 않습니다: {err}")).into()
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    routes::public::configure(cfg);
    routes::admin::configure(cfg);
    routes::cron::configure(cfg);
}
