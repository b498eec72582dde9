use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::ApiError,
    models::{
        self, BlockedTimeRow, ConsultationRow, BLOCK_DATE, BLOCK_TIME_SLOT, REQUEST_VISIT,
        STATUS_PENDING,
    },
};

/// Every booking occupies a fixed one-hour slot starting at preferred_time.
pub const SLOT_MINUTES: i64 = 60;

pub const CONFLICT_MESSAGE: &str =
    "선택하신 시간에는 예약이 불가능합니다. 다른 시간을 선택해주세요.";

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^01[0-9]-?[0-9]{3,4}-?[0-9]{4}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref TIME_RE: Regex = Regex::new(r"^\d{2}:\d{2}$").unwrap();
}

/// Public intake payload. Unknown fields are rejected at the boundary
/// instead of being silently dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeRequest {
    pub request_type: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub office_location: Option<String>,
    pub preferred_lawyer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    BlockedDate,
    BlockedSlot,
    BookingOverlap,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::BlockedDate => "blocked_date",
            ConflictReason::BlockedSlot => "blocked_time_slot",
            ConflictReason::BookingOverlap => "booking_overlap",
        }
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

pub fn validate_intake(input: &IntakeRequest) -> Result<(), ApiError> {
    if !models::is_valid_request_type(&input.request_type) {
        return Err(ApiError::Validation("상담 유형을 선택해주세요".to_string()));
    }
    if input.name.trim().chars().count() < 2 {
        return Err(ApiError::Validation("이름은 2자 이상이어야 합니다".to_string()));
    }
    if !PHONE_RE.is_match(input.phone.trim()) {
        return Err(ApiError::Validation("올바른 전화번호를 입력하세요".to_string()));
    }
    if let Some(email) = input.email.as_deref() {
        if !email.trim().is_empty() && !EMAIL_RE.is_match(email.trim()) {
            return Err(ApiError::Validation("올바른 이메일 주소를 입력하세요".to_string()));
        }
    }
    if let Some(office) = input.office_location.as_deref() {
        if !office.trim().is_empty() && !models::is_valid_office(office.trim()) {
            return Err(ApiError::Validation("사무소를 선택해주세요".to_string()));
        }
    }

    if models::is_scheduled_type(&input.request_type) {
        let date = input.preferred_date.as_deref().unwrap_or("").trim().to_string();
        if !DATE_RE.is_match(&date) {
            return Err(ApiError::Validation(
                "날짜 형식이 올바르지 않습니다 (YYYY-MM-DD)".to_string(),
            ));
        }
        let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| ApiError::Validation("날짜 형식이 올바르지 않습니다 (YYYY-MM-DD)".to_string()))?;
        if parsed < Local::now().date_naive() {
            return Err(ApiError::Validation("과거 날짜는 예약할 수 없습니다".to_string()));
        }

        let time = input.preferred_time.as_deref().unwrap_or("").trim();
        if !TIME_RE.is_match(time) || time_to_minutes(time).is_none() {
            return Err(ApiError::Validation(
                "시간 형식이 올바르지 않습니다 (HH:MM)".to_string(),
            ));
        }

        if input.request_type == REQUEST_VISIT
            && input
                .office_location
                .as_deref()
                .map_or(true, |o| o.trim().is_empty())
        {
            return Err(ApiError::Validation(
                "방문 상담의 경우 사무소 위치를 선택해주세요".to_string(),
            ));
        }
    }

    Ok(())
}

pub fn is_valid_date(value: &str) -> bool {
    DATE_RE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

pub fn is_valid_time(value: &str) -> bool {
    TIME_RE.is_match(value) && time_to_minutes(value).is_some()
}

pub fn time_to_minutes(value: &str) -> Option<i64> {
    let parsed = NaiveTime::parse_from_str(value, "%H:%M").ok()?;
    Some(i64::from(parsed.hour()) * 60 + i64::from(parsed.minute()))
}

pub fn ranges_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}

/// Find whatever blocks the requested slot: an operator-declared blocked
/// date or time range, or another live booking's slot at the same office.
/// An office-less request is checked against every block and against
/// office-less bookings only.
pub async fn find_conflict(
    pool: &SqlitePool,
    date: &str,
    time: &str,
    office: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<Option<ConflictReason>, sqlx::Error> {
    let slot_start = match time_to_minutes(time) {
        Some(start) => start,
        None => return Ok(None),
    };
    let slot_end = slot_start + SLOT_MINUTES;

    let blocks = match office {
        Some(office) => {
            sqlx::query_as::<_, BlockedTimeRow>(
                r#"SELECT * FROM blocked_times
                   WHERE blocked_date = ? AND (office_location = ? OR office_location IS NULL)"#,
            )
            .bind(date)
            .bind(office)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, BlockedTimeRow>(
                "SELECT * FROM blocked_times WHERE blocked_date = ?",
            )
            .bind(date)
            .fetch_all(pool)
            .await?
        }
    };

    for block in &blocks {
        if block.block_type == BLOCK_DATE {
            return Ok(Some(ConflictReason::BlockedDate));
        }
        if block.block_type == BLOCK_TIME_SLOT {
            let (Some(start), Some(end)) = (
                block.blocked_time_start.as_deref().and_then(time_to_minutes),
                block.blocked_time_end.as_deref().and_then(time_to_minutes),
            ) else {
                continue;
            };
            if ranges_overlap(slot_start, slot_end, start, end) {
                return Ok(Some(ConflictReason::BlockedSlot));
            }
        }
    }

    let existing = sqlx::query_as::<_, (String, String)>(
        r#"SELECT id, preferred_time FROM consultations
           WHERE preferred_date = ?
             AND preferred_time IS NOT NULL
             AND status IN ('pending', 'confirmed')
             AND COALESCE(office_location, '') = ?"#,
    )
    .bind(date)
    .bind(office.unwrap_or(""))
    .fetch_all(pool)
    .await?;

    for (id, other_time) in existing {
        if exclude_id == Some(id.as_str()) {
            continue;
        }
        let Some(other_start) = time_to_minutes(&other_time) else {
            continue;
        };
        if ranges_overlap(slot_start, slot_end, other_start, other_start + SLOT_MINUTES) {
            return Ok(Some(ConflictReason::BookingOverlap));
        }
    }

    Ok(None)
}

/// Validate, conflict-check, and persist a consultation with status
/// `pending`. A unique-index violation from a concurrent insert for the
/// same slot surfaces as the same conflict error as the pre-insert check.
pub async fn create_consultation(
    pool: &SqlitePool,
    input: IntakeRequest,
) -> Result<ConsultationRow, ApiError> {
    validate_intake(&input)?;

    let scheduled = models::is_scheduled_type(&input.request_type);
    let date = none_if_blank(input.preferred_date.clone()).filter(|_| scheduled);
    let time = none_if_blank(input.preferred_time.clone()).filter(|_| scheduled);
    let office = none_if_blank(input.office_location.clone()).filter(|_| scheduled);

    if let (Some(date), Some(time)) = (date.as_deref(), time.as_deref()) {
        if let Some(_reason) = find_conflict(pool, date, time, office.as_deref(), None).await? {
            return Err(ApiError::Conflict(CONFLICT_MESSAGE.to_string()));
        }
    }

    let id = new_id();
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"INSERT INTO consultations
           (id, request_type, name, phone, email, category, message, status,
            preferred_date, preferred_time, office_location, preferred_lawyer,
            created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&input.request_type)
    .bind(input.name.trim())
    .bind(input.phone.trim())
    .bind(none_if_blank(input.email))
    .bind(none_if_blank(input.category))
    .bind(none_if_blank(input.message))
    .bind(STATUS_PENDING)
    .bind(&date)
    .bind(&time)
    .bind(&office)
    .bind(none_if_blank(input.preferred_lawyer))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await;

    if let Err(err) = result {
        if err
            .as_database_error()
            .map_or(false, |db_err| db_err.is_unique_violation())
        {
            return Err(ApiError::Conflict(CONFLICT_MESSAGE.to_string()));
        }
        return Err(err.into());
    }

    crate::db::fetch_consultation(pool, &id)
        .await
        .ok_or(ApiError::Internal)
}
