use actix_web::{
    body::BoxBody,
    cookie::{time::Duration, Cookie, SameSite},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand_core::OsRng;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{models::UserRow, state::AppState};

pub const SESSION_COOKIE: &str = "theyool_session";
const SESSION_HOURS: i64 = 24;

/// Authenticated admin identity, injected into request extensions by
/// `session_guard` and extracted by handlers with `web::ReqData<AuthUser>`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn authenticate_credentials(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Option<UserRow> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, email, display_name, role, password_hash, active, created_at
           FROM users
           WHERE email = ? AND active = 1
           LIMIT 1"#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .ok()??;

    if !verify_password(password, &user.password_hash) {
        return None;
    }

    Some(user)
}

/// Issue a session token with a fixed 24h lifetime. Expired rows are purged
/// on the way in so the table does not grow without bound.
pub async fn create_session(pool: &SqlitePool, user_id: &str) -> Result<String, sqlx::Error> {
    let now = Utc::now();
    let _ = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await;

    let token = new_id();
    let expires_at = now + ChronoDuration::hours(SESSION_HOURS);
    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(expires_at.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(token)
}

pub async fn session_user(pool: &SqlitePool, token: &str) -> Option<AuthUser> {
    let row = sqlx::query_as::<_, (String, String, String, String)>(
        r#"SELECT s.expires_at, u.id, u.email, u.display_name
           FROM sessions s
           JOIN users u ON u.id = s.user_id AND u.active = 1
           WHERE s.token = ?
           LIMIT 1"#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .ok()??;

    let (expires_at, id, email, display_name) = row;
    let expired = DateTime::parse_from_rfc3339(&expires_at)
        .map(|ts| ts.with_timezone(&Utc) < Utc::now())
        .unwrap_or(true);

    if expired {
        let _ = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await;
        return None;
    }

    Some(AuthUser {
        id,
        email,
        display_name,
    })
}

pub async fn destroy_session(pool: &SqlitePool, token: &str) {
    let _ = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await;
}

pub fn session_cookie(req: &HttpRequest, token: &str) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(SESSION_HOURS));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_session_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

/// Session-cookie guard for the admin scope. Valid session: the admin
/// identity lands in request extensions. Anything else: 401 envelope.
pub async fn session_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    let user = match req.app_data::<web::Data<AppState>>() {
        Some(state) => match req.cookie(SESSION_COOKIE) {
            Some(cookie) => session_user(&state.db, cookie.value()).await,
            None => None,
        },
        None => None,
    };

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            let res = next.call(req).await?;
            Ok(res.map_into_boxed_body())
        }
        None => {
            let response = HttpResponse::Unauthorized().json(json!({
                "success": false,
                "message": "인증이 필요합니다.",
            }));
            Ok(req.into_response(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_admin, test_pool};

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("secret-pass").unwrap();
        assert!(verify_password("secret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
        assert!(!verify_password("secret-pass", "not-a-hash"));
    }

    #[tokio::test]
    async fn credentials_round_trip() {
        let pool = test_pool().await;
        create_admin(&pool, "admin@example.com", "관리자", "pw123456")
            .await
            .unwrap();

        assert!(authenticate_credentials(&pool, "admin@example.com", "pw123456")
            .await
            .is_some());
        assert!(authenticate_credentials(&pool, "admin@example.com", "nope")
            .await
            .is_none());
        assert!(authenticate_credentials(&pool, "other@example.com", "pw123456")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn session_expiry_is_enforced() {
        let pool = test_pool().await;
        create_admin(&pool, "admin@example.com", "관리자", "pw123456")
            .await
            .unwrap();
        let user = authenticate_credentials(&pool, "admin@example.com", "pw123456")
            .await
            .unwrap();

        let token = create_session(&pool, &user.id).await.unwrap();
        assert!(session_user(&pool, &token).await.is_some());
        assert!(session_user(&pool, "missing-token").await.is_none());

        // Force the session into the past; it must be rejected and removed.
        let past = (Utc::now() - ChronoDuration::hours(1)).to_rfc3339();
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE token = ?")
            .bind(&past)
            .bind(&token)
            .execute(&pool)
            .await
            .unwrap();

        assert!(session_user(&pool, &token).await.is_none());
        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE token = ?")
            .bind(&token)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining.0, 0);
    }
}
