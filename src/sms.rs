use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::ApiError,
    models::{
        ConsultationRow, SmsLogRow, SmsTemplateRow, OFFICE_SHARED, STATUS_CANCELLED,
        STATUS_COMPLETED, STATUS_CONFIRMED,
    },
    state::{AppState, SmsConfig},
};

/// Messages at most 90 UTF-8 bytes go out as SMS, longer ones as LMS.
const SMS_BYTE_LIMIT: usize = 90;

lazy_static! {
    static ref UNRESOLVED_VAR_RE: Regex = Regex::new(r"\{\{[^}]+\}\}").unwrap();
}

/// Substitute `{{key}}` placeholders; anything left unresolved is blanked.
pub fn render_template(content: &str, vars: &[(&str, String)]) -> String {
    let mut result = content.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{key}}}}}"), value);
    }
    UNRESOLVED_VAR_RE.replace_all(&result, "").trim().to_string()
}

pub fn message_type_for(content: &str) -> &'static str {
    if content.len() <= SMS_BYTE_LIMIT {
        "SMS"
    } else {
        "LMS"
    }
}

pub fn vars_from_consultation(row: &ConsultationRow) -> Vec<(&'static str, String)> {
    vec![
        ("customerName", row.name.clone()),
        ("customerPhone", row.phone.clone()),
        ("bookingDate", row.preferred_date.clone().unwrap_or_default()),
        ("bookingTime", row.preferred_time.clone().unwrap_or_default()),
        ("office", row.office_location.clone().unwrap_or_default()),
        ("lawyerName", row.preferred_lawyer.clone().unwrap_or_default()),
    ]
}

/// Office-specific template wins; the shared bucket is the fallback.
pub async fn load_template(
    pool: &SqlitePool,
    office: Option<&str>,
    template_type: &str,
) -> Result<Option<SmsTemplateRow>, sqlx::Error> {
    if let Some(office) = office {
        let row = sqlx::query_as::<_, SmsTemplateRow>(
            "SELECT * FROM sms_templates WHERE office = ? AND template_type = ? AND is_active = 1 LIMIT 1",
        )
        .bind(office)
        .bind(template_type)
        .fetch_optional(pool)
        .await?;
        if row.is_some() {
            return Ok(row);
        }
    }

    sqlx::query_as::<_, SmsTemplateRow>(
        "SELECT * FROM sms_templates WHERE office = ? AND template_type = ? AND is_active = 1 LIMIT 1",
    )
    .bind(OFFICE_SHARED)
    .bind(template_type)
    .fetch_optional(pool)
    .await
}

async fn insert_log(
    pool: &SqlitePool,
    consultation_id: Option<&str>,
    template: Option<&SmsTemplateRow>,
    template_type: &str,
    to: &str,
    recipient_name: Option<&str>,
    message_type: &str,
    content: &str,
    status: &str,
    error_message: Option<&str>,
) -> Result<String, sqlx::Error> {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO sms_logs
           (id, consultation_id, template_id, template_type, recipient_phone, recipient_name,
            message_type, content, status, error_message, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(consultation_id)
    .bind(template.map(|t| t.id.as_str()))
    .bind(template_type)
    .bind(to)
    .bind(recipient_name)
    .bind(message_type)
    .bind(content)
    .bind(status)
    .bind(error_message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

async fn finish_log(pool: &SqlitePool, log_id: &str, status: &str, error_message: Option<&str>) {
    let _ = sqlx::query(
        "UPDATE sms_logs SET status = ?, error_message = ?, sent_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(error_message)
    .bind(Utc::now().to_rfc3339())
    .bind(log_id)
    .execute(pool)
    .await;
}

/// Render and send one message, recording exactly one sms_logs row.
/// Delivery is best effort: gateway failures end up in the log, never in
/// the caller's control flow.
pub async fn dispatch(
    state: &AppState,
    consultation_id: Option<&str>,
    to: &str,
    recipient_name: Option<&str>,
    template_type: &str,
    office: Option<&str>,
    vars: &[(&str, String)],
) -> Result<String, sqlx::Error> {
    let template = load_template(&state.db, office, template_type).await?;

    let Some(template) = template else {
        log::warn!("No active SMS template for type '{template_type}'");
        return insert_log(
            &state.db,
            consultation_id,
            None,
            template_type,
            to,
            recipient_name,
            "SMS",
            "",
            "skipped",
            Some("template not found"),
        )
        .await;
    };

    let content = render_template(&template.content, vars);
    let message_type = message_type_for(&content);

    let log_id = insert_log(
        &state.db,
        consultation_id,
        Some(&template),
        template_type,
        to,
        recipient_name,
        message_type,
        &content,
        "pending",
        None,
    )
    .await?;

    if !state.sms.enabled() {
        log::info!("SMS gateway not configured; skipping send to {to}");
        finish_log(&state.db, &log_id, "skipped", Some("gateway not configured")).await;
        return Ok(log_id);
    }

    match send_via_gateway(&state.sms, to, &content).await {
        Ok(()) => finish_log(&state.db, &log_id, "sent", None).await,
        Err(err) => {
            log::warn!("SMS send to {to} failed: {err}");
            finish_log(&state.db, &log_id, "failed", Some(&err)).await;
        }
    }

    Ok(log_id)
}

async fn send_via_gateway(config: &SmsConfig, to: &str, text: &str) -> Result<(), String> {
    let url = format!("{}/messages/v4/send", config.api_base);
    let body = json!({
        "message": {
            "to": to.replace('-', ""),
            "from": config.from_number.replace('-', ""),
            "text": text,
        }
    });

    let response = reqwest::Client::new()
        .post(&url)
        .header("x-api-key", &config.api_key)
        .header("x-api-secret", &config.api_secret)
        .json(&body)
        .send()
        .await
        .map_err(|err| err.to_string())?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("gateway returned {}", response.status()))
    }
}

/// Fire-and-forget notification for a status transition. Statuses without
/// a template mapping send nothing.
pub async fn send_status_sms(state: &AppState, consultation: &ConsultationRow, new_status: &str) {
    let template_type = match new_status {
        STATUS_CONFIRMED => "confirmed",
        STATUS_CANCELLED => "cancelled",
        STATUS_COMPLETED => "thank_you",
        _ => return,
    };

    let vars = vars_from_consultation(consultation);
    if let Err(err) = dispatch(
        state,
        Some(&consultation.id),
        &consultation.phone,
        Some(&consultation.name),
        template_type,
        consultation.office_location.as_deref(),
        &vars,
    )
    .await
    {
        log::warn!(
            "Failed to record SMS for consultation {}: {err}",
            consultation.id
        );
    }
}

pub async fn reminder_already_sent(
    pool: &SqlitePool,
    consultation_id: &str,
) -> Result<bool, sqlx::Error> {
    // Failed sends stay retryable; anything else counts as delivered once.
    let count: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM sms_logs
           WHERE consultation_id = ? AND template_type = 'reminder' AND status != 'failed'"#,
    )
    .bind(consultation_id)
    .fetch_one(pool)
    .await?;
    Ok(count.0 > 0)
}

/// Admin-triggered resend of a failed log entry.
pub async fn resend(state: &AppState, log_id: &str) -> Result<SmsLogRow, ApiError> {
    let log = sqlx::query_as::<_, SmsLogRow>("SELECT * FROM sms_logs WHERE id = ? LIMIT 1")
        .bind(log_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if !state.sms.enabled() {
        return Err(ApiError::Validation(
            "SMS 게이트웨이가 설정되지 않았습니다.".to_string(),
        ));
    }

    match send_via_gateway(&state.sms, &log.recipient_phone, &log.content).await {
        Ok(()) => finish_log(&state.db, log_id, "sent", None).await,
        Err(err) => {
            log::warn!("SMS resend {log_id} failed: {err}");
            finish_log(&state.db, log_id, "failed", Some(&err)).await;
        }
    }

    sqlx::query_as::<_, SmsLogRow>("SELECT * FROM sms_logs WHERE id = ? LIMIT 1")
        .bind(log_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_defaults, test_pool};

    async fn test_state() -> AppState {
        let pool = test_pool().await;
        seed_defaults(&pool).await.unwrap();
        AppState {
            db: pool,
            sms: SmsConfig::disabled(),
            cron_secret: None,
        }
    }

    #[test]
    fn template_rendering_substitutes_and_blanks() {
        let vars = vec![("customerName", "홍길동".to_string())];
        let rendered = render_template("{{customerName}}님, {{bookingDate}} 예약", &vars);
        assert_eq!(rendered, "홍길동님,  예약");

        let rendered = render_template("  {{unknown}}  ", &[]);
        assert_eq!(rendered, "");
    }

    #[test]
    fn message_type_switches_at_ninety_bytes() {
        assert_eq!(message_type_for(&"a".repeat(90)), "SMS");
        assert_eq!(message_type_for(&"a".repeat(91)), "LMS");
        // Hangul is 3 bytes per char in UTF-8; 31 chars exceed the limit.
        assert_eq!(message_type_for(&"가".repeat(30)), "SMS");
        assert_eq!(message_type_for(&"가".repeat(31)), "LMS");
    }

    #[tokio::test]
    async fn office_template_wins_over_shared() {
        let state = test_state().await;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO sms_templates
               (id, name, office, template_type, content, message_type, is_active, created_at, updated_at)
               VALUES (?, '천안 확정', '천안', 'confirmed', '천안 전용 안내', 'SMS', 1, ?, ?)"#,
        )
        .bind(new_id())
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .unwrap();

        let specific = load_template(&state.db, Some("천안"), "confirmed")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(specific.office, "천안");

        let fallback = load_template(&state.db, Some("평택"), "confirmed")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fallback.office, "공통");

        assert!(load_template(&state.db, None, "no_such_type")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn dispatch_records_exactly_one_log_row() {
        let state = test_state().await;
        let vars = vec![("customerName", "홍길동".to_string())];
        dispatch(&state, None, "010-1234-5678", Some("홍길동"), "confirmed", None, &vars)
            .await
            .unwrap();

        let logs = sqlx::query_as::<_, SmsLogRow>("SELECT * FROM sms_logs")
            .fetch_all(&state.db)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        // Gateway unconfigured: logged, not sent, and no error surfaced.
        assert_eq!(logs[0].status, "skipped");
        assert!(logs[0].content.contains("홍길동"));
        assert_eq!(logs[0].template_type.as_deref(), Some("confirmed"));
    }

    #[tokio::test]
    async fn missing_template_logs_a_skip() {
        let state = test_state().await;
        dispatch(&state, None, "010-1234-5678", None, "payment_pending", None, &[])
            .await
            .unwrap();

        let log = sqlx::query_as::<_, SmsLogRow>("SELECT * FROM sms_logs")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(log.status, "skipped");
        assert_eq!(log.error_message.as_deref(), Some("template not found"));
    }
}
