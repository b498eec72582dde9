use serde::Serialize;

pub const ROLE_ADMIN: &str = "admin";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_CONFIRMED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_CANCELLED,
];

pub const REQUEST_CALLBACK: &str = "callback";
pub const REQUEST_VISIT: &str = "visit";
pub const REQUEST_VIDEO: &str = "video";
pub const REQUEST_INFO: &str = "info";

pub const REQUEST_TYPES: &[&str] = &[REQUEST_CALLBACK, REQUEST_VISIT, REQUEST_VIDEO, REQUEST_INFO];

pub const OFFICE_CHEONAN: &str = "천안";
pub const OFFICE_PYEONGTAEK: &str = "평택";
pub const OFFICES: &[&str] = &[OFFICE_CHEONAN, OFFICE_PYEONGTAEK];

/// Template office bucket shared by every location.
pub const OFFICE_SHARED: &str = "공통";

pub const BLOCK_DATE: &str = "date";
pub const BLOCK_TIME_SLOT: &str = "time_slot";

pub fn is_valid_status(value: &str) -> bool {
    STATUSES.contains(&value)
}

pub fn is_valid_request_type(value: &str) -> bool {
    REQUEST_TYPES.contains(&value)
}

/// visit/video requests carry a date, a time, and (for visits) an office.
pub fn is_scheduled_type(value: &str) -> bool {
    value == REQUEST_VISIT || value == REQUEST_VIDEO
}

pub fn is_valid_office(value: &str) -> bool {
    OFFICES.contains(&value)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConsultationRow {
    pub id: String,
    pub request_type: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub office_location: Option<String>,
    pub preferred_lawyer: Option<String>,
    pub admin_notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlockedTimeRow {
    pub id: String,
    pub block_type: String,
    pub blocked_date: String,
    pub blocked_time_start: Option<String>,
    pub blocked_time_end: Option<String>,
    pub office_location: Option<String>,
    pub reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogPostRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LegalCaseRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub category: String,
    pub summary: Option<String>,
    pub content: String,
    pub result: Option<String>,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FaqRow {
    pub id: String,
    pub slug: String,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub display_order: i64,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InstagramPostRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub caption: Option<String>,
    pub image_url: String,
    pub permalink: Option<String>,
    pub likes: i64,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TestimonialCaseRow {
    pub id: String,
    pub category: String,
    pub highlight_text: String,
    pub client_initial: String,
    pub full_story: Option<String>,
    pub case_date: String,
    pub attorney_name: Option<String>,
    pub consent_given: bool,
    pub published: bool,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EvidencePhotoRow {
    pub id: String,
    pub case_id: String,
    pub evidence_type: String,
    pub photo_url: String,
    pub caption: Option<String>,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SmsTemplateRow {
    pub id: String,
    pub name: String,
    pub office: String,
    pub template_type: String,
    pub content: String,
    pub message_type: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SmsLogRow {
    pub id: String,
    pub consultation_id: Option<String>,
    pub template_id: Option<String>,
    pub template_type: Option<String>,
    pub recipient_phone: String,
    pub recipient_name: Option<String>,
    pub message_type: String,
    pub content: String,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: String,
    pub kind: String,
    pub message: String,
    pub user_id: Option<String>,
    pub consultation_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_set_accepts_lifecycle_values() {
        for status in STATUSES {
            assert!(is_valid_status(status));
        }
        assert!(!is_valid_status("no_show"));
        assert!(!is_valid_status(""));
    }

    #[test]
    fn only_visit_and_video_are_scheduled() {
        assert!(is_scheduled_type(REQUEST_VISIT));
        assert!(is_scheduled_type(REQUEST_VIDEO));
        assert!(!is_scheduled_type(REQUEST_CALLBACK));
        assert!(!is_scheduled_type(REQUEST_INFO));
    }

    #[test]
    fn offices_are_the_two_branches() {
        assert!(is_valid_office(OFFICE_CHEONAN));
        assert!(is_valid_office(OFFICE_PYEONGTAEK));
        assert!(!is_valid_office(OFFICE_SHARED));
        assert!(!is_valid_office("서울"));
    }
}
