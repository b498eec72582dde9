use chrono::{Duration, Local, Utc};
use serde::Serialize;

use crate::{
    booking, db,
    models::{ConsultationRow, STATUS_CONFIRMED},
    sms,
    state::AppState,
};

/// Pending bookings younger than this are left for a human to review.
const AUTO_CONFIRM_AGE_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
pub struct SweepItem {
    pub id: String,
    pub name: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub total_processed: usize,
    pub confirmed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<SweepItem>,
}

impl SweepSummary {
    fn record(&mut self, row: &ConsultationRow, outcome: &str, reason: Option<String>) {
        match outcome {
            "confirmed" | "sent" => self.confirmed += 1,
            "failed" => self.failed += 1,
            _ => self.skipped += 1,
        }
        self.details.push(SweepItem {
            id: row.id.clone(),
            name: row.name.clone(),
            date: row.preferred_date.clone(),
            time: row.preferred_time.clone(),
            outcome: outcome.to_string(),
            reason,
        });
    }
}

/// Promote uncontested stale pending bookings to confirmed. Each item is
/// processed in isolation: one failure never aborts the batch.
pub async fn auto_confirm_sweep(state: &AppState) -> Result<SweepSummary, sqlx::Error> {
    let cutoff = (Utc::now() - Duration::hours(AUTO_CONFIRM_AGE_HOURS)).to_rfc3339();
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

    let pending = sqlx::query_as::<_, ConsultationRow>(
        r#"SELECT * FROM consultations
           WHERE status = 'pending'
             AND request_type IN ('visit', 'video')
             AND created_at < ?
             AND preferred_date >= ?
           ORDER BY created_at ASC"#,
    )
    .bind(&cutoff)
    .bind(&today)
    .fetch_all(&state.db)
    .await?;

    let mut summary = SweepSummary::default();
    for row in pending {
        summary.total_processed += 1;
        match try_confirm(state, &row).await {
            Ok(None) => summary.record(&row, "confirmed", None),
            Ok(Some(reason)) => summary.record(&row, "skipped", Some(reason)),
            Err(err) => summary.record(&row, "failed", Some(err.to_string())),
        }
    }

    log::info!(
        "Auto-confirm sweep: {} processed, {} confirmed, {} skipped, {} failed",
        summary.total_processed,
        summary.confirmed,
        summary.skipped,
        summary.failed
    );

    Ok(summary)
}

/// Ok(None) means confirmed; Ok(Some(reason)) means left pending.
async fn try_confirm(
    state: &AppState,
    row: &ConsultationRow,
) -> Result<Option<String>, sqlx::Error> {
    let (Some(date), Some(time)) = (row.preferred_date.as_deref(), row.preferred_time.as_deref())
    else {
        return Ok(Some("missing_schedule".to_string()));
    };

    if let Some(conflict) = booking::find_conflict(
        &state.db,
        date,
        time,
        row.office_location.as_deref(),
        Some(&row.id),
    )
    .await?
    {
        return Ok(Some(conflict.as_str().to_string()));
    }

    let now = Utc::now().to_rfc3339();
    let note = format!("[자동 확정: {now}]");
    let admin_notes = match row.admin_notes.as_deref() {
        Some(existing) => format!("{existing}\n\n{note}"),
        None => note,
    };

    let updated = sqlx::query(
        r#"UPDATE consultations
           SET status = 'confirmed', confirmed_at = ?, admin_notes = ?, updated_at = ?
           WHERE id = ? AND status = 'pending'"#,
    )
    .bind(&now)
    .bind(&admin_notes)
    .bind(&now)
    .bind(&row.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(Some("status_changed_concurrently".to_string()));
    }

    sms::send_status_sms(state, row, STATUS_CONFIRMED).await;
    db::log_activity(
        &state.db,
        "booking_auto_confirmed",
        &format!("{} 예약이 자동 확정되었습니다.", row.name),
        None,
        Some(&row.id),
    )
    .await;

    Ok(None)
}

/// Send a day-before reminder to every confirmed booking scheduled for
/// tomorrow, at most once per booking.
pub async fn reminder_sweep(state: &AppState) -> Result<SweepSummary, sqlx::Error> {
    let tomorrow = (Local::now().date_naive() + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let upcoming = sqlx::query_as::<_, ConsultationRow>(
        r#"SELECT * FROM consultations
           WHERE status = 'confirmed'
             AND request_type IN ('visit', 'video')
             AND preferred_date = ?
           ORDER BY preferred_time ASC"#,
    )
    .bind(&tomorrow)
    .fetch_all(&state.db)
    .await?;

    let mut summary = SweepSummary::default();
    for row in upcoming {
        summary.total_processed += 1;
        match send_reminder(state, &row).await {
            Ok(true) => summary.record(&row, "sent", None),
            Ok(false) => summary.record(&row, "skipped", Some("already_sent".to_string())),
            Err(err) => summary.record(&row, "failed", Some(err.to_string())),
        }
    }

    log::info!(
        "Reminder sweep: {} processed, {} sent, {} skipped, {} failed",
        summary.total_processed,
        summary.confirmed,
        summary.skipped,
        summary.failed
    );

    Ok(summary)
}

async fn send_reminder(state: &AppState, row: &ConsultationRow) -> Result<bool, sqlx::Error> {
    if sms::reminder_already_sent(&state.db, &row.id).await? {
        return Ok(false);
    }

    let vars = sms::vars_from_consultation(row);
    sms::dispatch(
        state,
        Some(&row.id),
        &row.phone,
        Some(&row.name),
        "reminder",
        row.office_location.as_deref(),
        &vars,
    )
    .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{create_consultation, IntakeRequest};
    use crate::db::{seed_defaults, test_pool};
    use crate::state::SmsConfig;

    async fn test_state() -> AppState {
        let pool = test_pool().await;
        seed_defaults(&pool).await.unwrap();
        AppState {
            db: pool,
            sms: SmsConfig::disabled(),
            cron_secret: None,
        }
    }

    fn tomorrow() -> String {
        (Local::now().date_naive() + Duration::days(1))
            .format("%Y-%m-%d")
            .to_string()
    }

    async fn insert_booking(state: &AppState, name: &str, time: &str, office: &str) -> String {
        let row = create_consultation(
            &state.db,
            IntakeRequest {
                request_type: "visit".to_string(),
                name: name.to_string(),
                phone: "010-1234-5678".to_string(),
                email: None,
                category: None,
                message: None,
                preferred_date: Some(tomorrow()),
                preferred_time: Some(time.to_string()),
                office_location: Some(office.to_string()),
                preferred_lawyer: None,
            },
        )
        .await
        .unwrap();
        row.id
    }

    async fn backdate(state: &AppState, id: &str, hours: i64) {
        let stamp = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        sqlx::query("UPDATE consultations SET created_at = ? WHERE id = ?")
            .bind(&stamp)
            .bind(id)
            .execute(&state.db)
            .await
            .unwrap();
    }

    async fn status_of(state: &AppState, id: &str) -> String {
        sqlx::query_as::<_, (String,)>("SELECT status FROM consultations WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn stale_uncontested_booking_is_confirmed_with_one_notification() {
        let state = test_state().await;
        let id = insert_booking(&state, "손님A", "10:00", "천안").await;
        backdate(&state, &id, 48).await;

        let summary = auto_confirm_sweep(&state).await.unwrap();
        assert_eq!(summary.total_processed, 1);
        assert_eq!(summary.confirmed, 1);
        assert_eq!(status_of(&state, &id).await, "confirmed");

        let row = crate::db::fetch_consultation(&state.db, &id).await.unwrap();
        assert!(row.confirmed_at.is_some());
        assert!(row.admin_notes.unwrap().contains("자동 확정"));

        let sms_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sms_logs WHERE consultation_id = ?")
                .bind(&id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(sms_count.0, 1);
    }

    #[tokio::test]
    async fn fresh_pending_booking_is_not_touched() {
        let state = test_state().await;
        let id = insert_booking(&state, "손님B", "11:00", "천안").await;

        let summary = auto_confirm_sweep(&state).await.unwrap();
        assert_eq!(summary.total_processed, 0);
        assert_eq!(status_of(&state, &id).await, "pending");
    }

    #[tokio::test]
    async fn conflicting_booking_stays_pending() {
        let state = test_state().await;
        let id = insert_booking(&state, "손님C", "10:00", "천안").await;
        backdate(&state, &id, 48).await;

        // A block created after intake now covers the slot.
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO blocked_times
               (id, block_type, blocked_date, office_location, created_at, updated_at)
               VALUES (?, 'date', ?, '천안', ?, ?)"#,
        )
        .bind(crate::auth::new_id())
        .bind(tomorrow())
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .unwrap();

        let summary = auto_confirm_sweep(&state).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.confirmed, 0);
        assert_eq!(status_of(&state, &id).await, "pending");
        assert_eq!(summary.details[0].reason.as_deref(), Some("blocked_date"));

        // The skip left no notification behind.
        let sms_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sms_logs WHERE consultation_id = ?")
                .bind(&id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(sms_count.0, 0);
    }

    #[tokio::test]
    async fn reminders_go_out_once() {
        let state = test_state().await;
        let id = insert_booking(&state, "손님D", "14:00", "평택").await;
        sqlx::query("UPDATE consultations SET status = 'confirmed' WHERE id = ?")
            .bind(&id)
            .execute(&state.db)
            .await
            .unwrap();

        let first = reminder_sweep(&state).await.unwrap();
        assert_eq!(first.confirmed, 1);

        let second = reminder_sweep(&state).await.unwrap();
        assert_eq!(second.confirmed, 0);
        assert_eq!(second.skipped, 1);

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sms_logs WHERE consultation_id = ? AND template_type = 'reminder'",
        )
        .bind(&id)
        .fetch_one(&state.db)
        .await
        .unwrap();
        assert_eq!(count.0, 1);
    }
}
