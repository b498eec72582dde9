use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{error::ApiError, state::AppState, sweep};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/cron/auto-confirm").route(web::post().to(auto_confirm)))
        .service(web::resource("/api/cron/send-reminders").route(web::post().to(send_reminders)));
}

/// The sweeps are driven by an external scheduler that authenticates with
/// a shared bearer secret, not with an admin session.
fn check_cron_secret(state: &AppState, req: &HttpRequest) -> Result<(), ApiError> {
    let Some(secret) = state.cron_secret.as_deref().filter(|s| !s.is_empty()) else {
        log::error!("CRON_SECRET is not configured");
        return Err(ApiError::Internal);
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented != Some(secret) {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

async fn auto_confirm(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    check_cron_secret(&state, &req)?;
    let summary = sweep::auto_confirm_sweep(&state).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary })))
}

async fn send_reminders(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    check_cron_secret(&state, &req)?;
    let summary = sweep::reminder_sweep(&state).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary })))
}
