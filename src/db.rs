use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    models::{ConsultationRow, ROLE_ADMIN},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_admin(pool).await?;
    seed_sms_templates(pool).await?;
    Ok(())
}

/// Audit trail for admin-facing mutations. Failures are swallowed: the
/// activity log must never fail the operation it describes.
pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
    user_id: Option<&str>,
    consultation_id: Option<&str>,
) {
    let _ = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, user_id, consultation_id, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(user_id)
    .bind(consultation_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await;
}

pub async fn fetch_consultation(pool: &SqlitePool, id: &str) -> Option<ConsultationRow> {
    sqlx::query_as::<_, ConsultationRow>("SELECT * FROM consultations WHERE id = ? LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .unwrap_or(None)
}

/// Create an admin account. Used by the env seeder and by tests.
pub async fn create_admin(
    pool: &SqlitePool,
    email: &str,
    display_name: &str,
    password: &str,
) -> Result<(), sqlx::Error> {
    let password_hash =
        hash_password(password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;

    sqlx::query(
        r#"INSERT INTO users (id, email, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(new_id())
    .bind(email)
    .bind(display_name)
    .bind(ROLE_ADMIN)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing =
        sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
            .bind(ROLE_ADMIN)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Ok(());
    }

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@theyool.com".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let display_name = env::var("ADMIN_DISPLAY_NAME").unwrap_or_else(|_| "관리자".to_string());

    if password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    create_admin(pool, &email, &display_name, &password).await
}

async fn seed_sms_templates(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let templates = vec![
        (
            "예약 확정 안내",
            "confirmed",
            "[법무법인 더율] {{customerName}}님, {{bookingDate}} {{bookingTime}} 상담이 확정되었습니다. 문의: 02-1234-5678",
        ),
        (
            "예약 취소 안내",
            "cancelled",
            "[법무법인 더율] {{customerName}}님, 신청하신 상담이 취소되었습니다. 재예약 문의: 02-1234-5678",
        ),
        (
            "상담 전일 리마인더",
            "reminder",
            "[법무법인 더율] {{customerName}}님, 내일 {{bookingTime}} {{office}} 사무소 상담이 예정되어 있습니다.",
        ),
        (
            "상담 완료 감사",
            "thank_you",
            "[법무법인 더율] {{customerName}}님, 상담에 참여해주셔서 감사합니다. 추가 문의는 언제든 연락주세요.",
        ),
    ];

    for (name, template_type, content) in templates {
        let exists = sqlx::query_as::<_, (String,)>(
            "SELECT id FROM sms_templates WHERE office = '공통' AND template_type = ? LIMIT 1",
        )
        .bind(template_type)
        .fetch_optional(pool)
        .await?;
        if exists.is_some() {
            continue;
        }

        let now = Utc::now().to_rfc3339();
        let message_type = if content.len() <= 90 { "SMS" } else { "LMS" };
        sqlx::query(
            r#"INSERT INTO sms_templates (id, name, office, template_type, content, message_type, is_active, created_at, updated_at)
               VALUES (?, ?, '공통', ?, ?, ?, 1, ?, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(template_type)
        .bind(content)
        .bind(message_type)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("connect options")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("in-memory pool");

    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_dir_helper_ignores_memory_urls() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://x/y").is_ok());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = test_pool().await;
        seed_defaults(&pool).await.expect("first seed");
        seed_defaults(&pool).await.expect("second seed");

        let admins: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins.0, 1);

        let templates: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sms_templates")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(templates.0, 4);
    }

    #[tokio::test]
    async fn activity_log_records_rows() {
        let pool = test_pool().await;
        log_activity(&pool, "test_event", "something happened", None, None).await;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activities")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
