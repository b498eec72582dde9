use actix_web::{middleware::from_fn, web, HttpResponse};
use chrono::{Datelike, Duration, Local, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    auth::{new_id, session_guard, AuthUser},
    booking, db,
    error::ApiError,
    models::{
        self, ActivityRow, BlockedTimeRow, BlogPostRow, ConsultationRow, EvidencePhotoRow, FaqRow,
        InstagramPostRow, LegalCaseRow, SmsLogRow, SmsTemplateRow, TestimonialCaseRow, BLOCK_DATE,
        BLOCK_TIME_SLOT, STATUS_CONFIRMED,
    },
    sms,
    state::AppState,
};

const TESTIMONIAL_CATEGORIES: &[&str] = &["alimony", "custody", "property", "adultery"];
const EVIDENCE_TYPES: &[&str] = &["kakao", "sms", "naver", "letter", "other"];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .wrap(from_fn(session_guard))
            .service(web::resource("/consultations").route(web::get().to(list_consultations)))
            .service(
                web::resource("/consultations/stats").route(web::get().to(consultation_stats)),
            )
            .service(
                web::resource("/consultations/{id}")
                    .route(web::get().to(get_consultation))
                    .route(web::patch().to(update_consultation))
                    .route(web::delete().to(delete_consultation)),
            )
            .service(
                web::resource("/blocked-times")
                    .route(web::get().to(list_blocked_times))
                    .route(web::post().to(create_blocked_time)),
            )
            .service(
                web::resource("/blocked-times/{id}")
                    .route(web::patch().to(update_blocked_time))
                    .route(web::delete().to(delete_blocked_time)),
            )
            .service(
                web::resource("/blog")
                    .route(web::get().to(list_blog))
                    .route(web::post().to(create_blog)),
            )
            .service(
                web::resource("/blog/{id}")
                    .route(web::get().to(get_blog))
                    .route(web::patch().to(update_blog))
                    .route(web::delete().to(delete_blog)),
            )
            .service(
                web::resource("/cases")
                    .route(web::get().to(list_cases))
                    .route(web::post().to(create_case)),
            )
            .service(
                web::resource("/cases/{id}")
                    .route(web::get().to(get_case))
                    .route(web::patch().to(update_case))
                    .route(web::delete().to(delete_case)),
            )
            .service(
                web::resource("/faqs")
                    .route(web::get().to(list_faqs))
                    .route(web::post().to(create_faq)),
            )
            .service(
                web::resource("/faqs/{id}")
                    .route(web::get().to(get_faq))
                    .route(web::patch().to(update_faq))
                    .route(web::delete().to(delete_faq)),
            )
            .service(
                web::resource("/instagram")
                    .route(web::get().to(list_instagram))
                    .route(web::post().to(create_instagram)),
            )
            .service(
                web::resource("/instagram/{id}")
                    .route(web::get().to(get_instagram))
                    .route(web::patch().to(update_instagram))
                    .route(web::delete().to(delete_instagram)),
            )
            .service(
                web::resource("/testimonial-cases")
                    .route(web::get().to(list_testimonials))
                    .route(web::post().to(create_testimonial)),
            )
            .service(
                web::resource("/testimonial-cases/{id}")
                    .route(web::get().to(get_testimonial))
                    .route(web::patch().to(update_testimonial))
                    .route(web::delete().to(delete_testimonial)),
            )
            .service(
                web::resource("/evidence-photos").route(web::post().to(create_evidence_photo)),
            )
            .service(
                web::resource("/evidence-photos/reorder")
                    .route(web::post().to(reorder_evidence_photos)),
            )
            .service(
                web::resource("/evidence-photos/{id}")
                    .route(web::delete().to(delete_evidence_photo)),
            )
            .service(web::resource("/sms-templates").route(web::get().to(list_sms_templates)))
            .service(
                web::resource("/sms-templates/{id}").route(web::patch().to(update_sms_template)),
            )
            .service(web::resource("/sms-logs").route(web::get().to(list_sms_logs)))
            .service(web::resource("/sms-logs/{id}/resend").route(web::post().to(resend_sms)))
            .service(web::resource("/activities").route(web::get().to(list_activities))),
    );
}

// ---------------------------------------------------------------------------
// Shared list plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AdminListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    category: Option<String>,
}

impl AdminListQuery {
    fn paging(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(40).clamp(1, 100);
        (page, limit, (page - 1) * limit)
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

fn pagination_json(page: i64, limit: i64, total: i64) -> serde_json::Value {
    json!({
        "page": page,
        "limit": limit,
        "total": total,
        "total_pages": (total + limit - 1) / limit,
    })
}

fn ok_data<T: serde::Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

fn ok_deleted() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn scalar(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

async fn scalar_with(pool: &SqlitePool, sql: &str, param: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(param)
        .fetch_one(pool)
        .await
        .unwrap_or(0)
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

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.chars().all(|c| !c.is_whitespace() && c != '/')
}

fn require_slug(slug: &str) -> Result<(), ApiError> {
    if !is_valid_slug(slug) {
        return Err(ApiError::Validation(
            "슬러그는 공백 없이 입력해야 합니다.".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Consultations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ConsultationFilter {
    status: Option<String>,
    request_type: Option<String>,
    office_location: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    search: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

fn push_consultation_filters(builder: &mut QueryBuilder<Sqlite>, filter: &ConsultationFilter) {
    if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(request_type) = filter.request_type.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND request_type = ")
            .push_bind(request_type.to_string());
    }
    if let Some(office) = filter.office_location.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND office_location = ")
            .push_bind(office.to_string());
    }
    if let Some(from) = filter.date_from.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND preferred_date >= ")
            .push_bind(from.to_string());
    }
    if let Some(to) = filter.date_to.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND preferred_date <= ")
            .push_bind(to.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone LIKE ")
            .push_bind(pattern.clone())
            .push(" OR COALESCE(email, '') LIKE ")
            .push_bind(pattern.clone())
            .push(" OR COALESCE(message, '') LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn list_consultations(
    state: web::Data<AppState>,
    query: web::Query<ConsultationFilter>,
) -> Result<HttpResponse, ApiError> {
    let filter = query.into_inner();
    let page = filter.page.unwrap_or(1).max(1);
    let limit = filter.limit.unwrap_or(40).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut count_builder =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM consultations WHERE 1=1");
    push_consultation_filters(&mut count_builder, &filter);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM consultations WHERE 1=1");
    push_consultation_filters(&mut builder, &filter);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows: Vec<ConsultationRow> = builder.build_query_as().fetch_all(&state.db).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination_json(page, limit, total),
    })))
}

async fn consultation_stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let pool = &state.db;
    let total = scalar(pool, "SELECT COUNT(*) FROM consultations").await;

    let mut by_status = serde_json::Map::new();
    for status in models::STATUSES {
        let count = scalar_with(
            pool,
            "SELECT COUNT(*) FROM consultations WHERE status = ?",
            status,
        )
        .await;
        by_status.insert(status.to_string(), json!(count));
    }

    let mut by_type = serde_json::Map::new();
    for request_type in models::REQUEST_TYPES {
        let count = scalar_with(
            pool,
            "SELECT COUNT(*) FROM consultations WHERE request_type = ?",
            request_type,
        )
        .await;
        by_type.insert(request_type.to_string(), json!(count));
    }

    let today = Local::now().date_naive();
    let today_count = scalar_with(
        pool,
        "SELECT COUNT(*) FROM consultations WHERE created_at >= ?",
        &format!("{today}T00:00:00"),
    )
    .await;

    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let week_count = scalar_with(
        pool,
        "SELECT COUNT(*) FROM consultations WHERE created_at >= ?",
        &format!("{week_start}T00:00:00"),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "total": total,
            "by_status": by_status,
            "by_type": by_type,
            "today": today_count,
            "this_week": week_count,
        },
    })))
}

async fn get_consultation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = db::fetch_consultation(&state.db, &path.into_inner())
        .await
        .ok_or_else(ApiError::not_found)?;
    Ok(ok_data(row))
}

#[derive(Debug, Deserialize)]
struct ConsultationUpdate {
    status: Option<String>,
    admin_notes: Option<String>,
    preferred_date: Option<String>,
    preferred_time: Option<String>,
    office_location: Option<String>,
    preferred_lawyer: Option<String>,
}

async fn update_consultation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ConsultationUpdate>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = db::fetch_consultation(&state.db, &id)
        .await
        .ok_or_else(ApiError::not_found)?;

    if let Some(status) = payload.status.as_deref() {
        if !models::is_valid_status(status) {
            return Err(ApiError::Validation("올바르지 않은 상태값입니다.".to_string()));
        }
    }
    if let Some(date) = payload.preferred_date.as_deref() {
        if !booking::is_valid_date(date) {
            return Err(ApiError::Validation(
                "날짜 형식이 올바르지 않습니다 (YYYY-MM-DD)".to_string(),
            ));
        }
    }
    if let Some(time) = payload.preferred_time.as_deref() {
        if !booking::is_valid_time(time) {
            return Err(ApiError::Validation(
                "시간 형식이 올바르지 않습니다 (HH:MM)".to_string(),
            ));
        }
    }
    if let Some(office) = payload.office_location.as_deref() {
        if !models::is_valid_office(office) {
            return Err(ApiError::Validation("사무소를 선택해주세요".to_string()));
        }
    }

    let status = payload.status.clone().unwrap_or_else(|| existing.status.clone());
    let status_changed = status != existing.status;
    let confirmed_at = if status_changed && status == STATUS_CONFIRMED {
        Some(Utc::now().to_rfc3339())
    } else {
        existing.confirmed_at.clone()
    };

    let admin_notes = payload.admin_notes.or(existing.admin_notes);
    let preferred_date = payload.preferred_date.or(existing.preferred_date);
    let preferred_time = payload.preferred_time.or(existing.preferred_time);
    let office_location = payload.office_location.or(existing.office_location);
    let preferred_lawyer = payload.preferred_lawyer.or(existing.preferred_lawyer);

    sqlx::query(
        r#"UPDATE consultations
           SET status = ?, admin_notes = ?, preferred_date = ?, preferred_time = ?,
               office_location = ?, preferred_lawyer = ?, confirmed_at = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&status)
    .bind(&admin_notes)
    .bind(&preferred_date)
    .bind(&preferred_time)
    .bind(&office_location)
    .bind(&preferred_lawyer)
    .bind(&confirmed_at)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    db::log_activity(
        &state.db,
        "consultation_updated",
        &format!("{}님이 상담 {}을(를) 수정했습니다.", auth.display_name, id),
        Some(&auth.id),
        Some(&id),
    )
    .await;

    let updated = db::fetch_consultation(&state.db, &id)
        .await
        .ok_or(ApiError::Internal)?;

    if status_changed {
        sms::send_status_sms(&state, &updated, &status).await;
    }

    Ok(ok_data(updated))
}

async fn delete_consultation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let deleted = sqlx::query("DELETE FROM consultations WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }

    db::log_activity(
        &state.db,
        "consultation_deleted",
        &format!("{}님이 상담 {}을(를) 삭제했습니다.", auth.display_name, id),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// Blocked times
// ---------------------------------------------------------------------------

async fn list_blocked_times(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, BlockedTimeRow>(
        "SELECT * FROM blocked_times ORDER BY blocked_date ASC, blocked_time_start ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(ok_data(rows))
}

#[derive(Debug, Deserialize)]
struct BlockedTimeCreate {
    block_type: String,
    blocked_date: String,
    blocked_time_start: Option<String>,
    blocked_time_end: Option<String>,
    office_location: Option<String>,
    reason: Option<String>,
}

async fn create_blocked_time(
    state: web::Data<AppState>,
    payload: web::Json<BlockedTimeCreate>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    if payload.block_type != BLOCK_DATE && payload.block_type != BLOCK_TIME_SLOT {
        return Err(ApiError::Validation("차단 유형이 올바르지 않습니다.".to_string()));
    }
    if !booking::is_valid_date(&payload.blocked_date) {
        return Err(ApiError::Validation(
            "날짜 형식이 올바르지 않습니다 (YYYY-MM-DD)".to_string(),
        ));
    }
    if let Some(office) = payload.office_location.as_deref().filter(|o| !o.is_empty()) {
        if !models::is_valid_office(office) {
            return Err(ApiError::Validation("사무소를 선택해주세요".to_string()));
        }
    }

    // A time_slot block needs a well-ordered range; a date block covers the
    // whole day and carries no range.
    let (start, end) = if payload.block_type == BLOCK_TIME_SLOT {
        let start = payload.blocked_time_start.as_deref().unwrap_or("");
        let end = payload.blocked_time_end.as_deref().unwrap_or("");
        if !booking::is_valid_time(start) || !booking::is_valid_time(end) {
            return Err(ApiError::Validation(
                "차단 시간대는 시작/종료 시간이 모두 필요합니다.".to_string(),
            ));
        }
        if booking::time_to_minutes(start) >= booking::time_to_minutes(end) {
            return Err(ApiError::Validation(
                "시작 시간은 종료 시간보다 빨라야 합니다.".to_string(),
            ));
        }
        (Some(start.to_string()), Some(end.to_string()))
    } else {
        (None, None)
    };

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO blocked_times
           (id, block_type, blocked_date, blocked_time_start, blocked_time_end,
            office_location, reason, created_by, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&payload.block_type)
    .bind(&payload.blocked_date)
    .bind(&start)
    .bind(&end)
    .bind(none_if_blank(payload.office_location))
    .bind(none_if_blank(payload.reason))
    .bind(&auth.email)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, BlockedTimeRow>("SELECT * FROM blocked_times WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

#[derive(Debug, Deserialize)]
struct BlockedTimeUpdate {
    reason: Option<String>,
}

async fn update_blocked_time(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<BlockedTimeUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let updated = sqlx::query("UPDATE blocked_times SET reason = ?, updated_at = ? WHERE id = ?")
        .bind(none_if_blank(payload.into_inner().reason))
        .bind(Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found());
    }

    let row = sqlx::query_as::<_, BlockedTimeRow>("SELECT * FROM blocked_times WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn delete_blocked_time(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM blocked_times WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// Blog posts
// ---------------------------------------------------------------------------

async fn list_blog(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, limit, offset) = query.paging();
    let (rows, total) = match query.search_pattern() {
        Some(pattern) => {
            let rows = sqlx::query_as::<_, BlogPostRow>(
                r#"SELECT * FROM blog_posts WHERE title LIKE ? OR slug LIKE ?
                   ORDER BY created_at DESC LIMIT ? OFFSET ?"#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM blog_posts WHERE title LIKE ? OR slug LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;
            (rows, total)
        }
        None => {
            let rows = sqlx::query_as::<_, BlogPostRow>(
                "SELECT * FROM blog_posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = scalar(&state.db, "SELECT COUNT(*) FROM blog_posts").await;
            (rows, total)
        }
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination_json(page, limit, total),
    })))
}

#[derive(Debug, Deserialize)]
struct BlogCreate {
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: String,
    category: Option<String>,
    published: Option<bool>,
}

async fn create_blog(
    state: web::Data<AppState>,
    payload: web::Json<BlogCreate>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "제목, 슬러그, 내용은 필수입니다.".to_string(),
        ));
    }
    require_slug(payload.slug.trim())?;

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    let published = payload.published.unwrap_or(false);
    let published_at = published.then(|| now.clone());

    sqlx::query(
        r#"INSERT INTO blog_posts
           (id, title, slug, excerpt, content, category, published, published_at, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(payload.title.trim())
    .bind(payload.slug.trim())
    .bind(none_if_blank(payload.excerpt))
    .bind(&payload.content)
    .bind(none_if_blank(payload.category))
    .bind(published)
    .bind(&published_at)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    db::log_activity(
        &state.db,
        "blog_created",
        &format!("{}님이 블로그 글을 작성했습니다.", auth.display_name),
        Some(&auth.id),
        None,
    )
    .await;

    let row = sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

async fn get_blog(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE id = ? LIMIT 1")
        .bind(path.into_inner())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(ok_data(row))
}

#[derive(Debug, Deserialize)]
struct BlogUpdate {
    title: Option<String>,
    slug: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    category: Option<String>,
    published: Option<bool>,
}

async fn update_blog(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<BlogUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE id = ? LIMIT 1")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Some(slug) = payload.slug.as_deref() {
        require_slug(slug.trim())?;
    }

    let title = payload.title.unwrap_or(existing.title);
    let slug = payload.slug.map(|s| s.trim().to_string()).unwrap_or(existing.slug);
    let excerpt = payload.excerpt.or(existing.excerpt);
    let content = payload.content.unwrap_or(existing.content);
    let category = payload.category.or(existing.category);
    let published = payload.published.unwrap_or(existing.published);
    let published_at = if published && existing.published_at.is_none() {
        Some(Utc::now().to_rfc3339())
    } else {
        existing.published_at
    };

    sqlx::query(
        r#"UPDATE blog_posts
           SET title = ?, slug = ?, excerpt = ?, content = ?, category = ?,
               published = ?, published_at = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&title)
    .bind(&slug)
    .bind(&excerpt)
    .bind(&content)
    .bind(&category)
    .bind(published)
    .bind(&published_at)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn delete_blog(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// Legal cases
// ---------------------------------------------------------------------------

async fn list_cases(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, limit, offset) = query.paging();
    let (rows, total) = match query.search_pattern() {
        Some(pattern) => {
            let rows = sqlx::query_as::<_, LegalCaseRow>(
                r#"SELECT * FROM legal_cases WHERE title LIKE ? OR slug LIKE ?
                   ORDER BY created_at DESC LIMIT ? OFFSET ?"#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM legal_cases WHERE title LIKE ? OR slug LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;
            (rows, total)
        }
        None => {
            let rows = sqlx::query_as::<_, LegalCaseRow>(
                "SELECT * FROM legal_cases ORDER BY created_at DESC LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = scalar(&state.db, "SELECT COUNT(*) FROM legal_cases").await;
            (rows, total)
        }
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination_json(page, limit, total),
    })))
}

#[derive(Debug, Deserialize)]
struct CaseCreate {
    slug: String,
    title: String,
    category: String,
    summary: Option<String>,
    content: String,
    result: Option<String>,
    published: Option<bool>,
}

async fn create_case(
    state: web::Data<AppState>,
    payload: web::Json<CaseCreate>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.title.trim().is_empty()
        || payload.category.trim().is_empty()
        || payload.content.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "제목, 카테고리, 내용은 필수입니다.".to_string(),
        ));
    }
    require_slug(payload.slug.trim())?;

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO legal_cases
           (id, slug, title, category, summary, content, result, published, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(payload.slug.trim())
    .bind(payload.title.trim())
    .bind(payload.category.trim())
    .bind(none_if_blank(payload.summary))
    .bind(&payload.content)
    .bind(none_if_blank(payload.result))
    .bind(payload.published.unwrap_or(false))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, LegalCaseRow>("SELECT * FROM legal_cases WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

async fn get_case(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = sqlx::query_as::<_, LegalCaseRow>("SELECT * FROM legal_cases WHERE id = ? LIMIT 1")
        .bind(path.into_inner())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(ok_data(row))
}

#[derive(Debug, Deserialize)]
struct CaseUpdate {
    slug: Option<String>,
    title: Option<String>,
    category: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    result: Option<String>,
    published: Option<bool>,
}

async fn update_case(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CaseUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = sqlx::query_as::<_, LegalCaseRow>("SELECT * FROM legal_cases WHERE id = ? LIMIT 1")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Some(slug) = payload.slug.as_deref() {
        require_slug(slug.trim())?;
    }

    let slug = payload.slug.map(|s| s.trim().to_string()).unwrap_or(existing.slug);
    let title = payload.title.unwrap_or(existing.title);
    let category = payload.category.unwrap_or(existing.category);
    let summary = payload.summary.or(existing.summary);
    let content = payload.content.unwrap_or(existing.content);
    let result = payload.result.or(existing.result);
    let published = payload.published.unwrap_or(existing.published);

    sqlx::query(
        r#"UPDATE legal_cases
           SET slug = ?, title = ?, category = ?, summary = ?, content = ?,
               result = ?, published = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&slug)
    .bind(&title)
    .bind(&category)
    .bind(&summary)
    .bind(&content)
    .bind(&result)
    .bind(published)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, LegalCaseRow>("SELECT * FROM legal_cases WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn delete_case(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM legal_cases WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// FAQs
// ---------------------------------------------------------------------------

async fn list_faqs(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            sqlx::query_as::<_, FaqRow>(
                "SELECT * FROM faqs WHERE category = ? ORDER BY display_order ASC, created_at ASC",
            )
            .bind(category)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, FaqRow>(
                "SELECT * FROM faqs ORDER BY display_order ASC, created_at ASC",
            )
            .fetch_all(&state.db)
            .await?
        }
    };
    Ok(ok_data(rows))
}

#[derive(Debug, Deserialize)]
struct FaqCreate {
    slug: String,
    question: String,
    answer: String,
    category: String,
    display_order: Option<i64>,
    published: Option<bool>,
}

async fn create_faq(
    state: web::Data<AppState>,
    payload: web::Json<FaqCreate>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.question.trim().is_empty()
        || payload.answer.trim().is_empty()
        || payload.category.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "질문, 답변, 카테고리는 필수입니다.".to_string(),
        ));
    }
    require_slug(payload.slug.trim())?;

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO faqs
           (id, slug, question, answer, category, display_order, published, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(payload.slug.trim())
    .bind(payload.question.trim())
    .bind(&payload.answer)
    .bind(payload.category.trim())
    .bind(payload.display_order.unwrap_or(0))
    .bind(payload.published.unwrap_or(false))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, FaqRow>("SELECT * FROM faqs WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

async fn get_faq(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = sqlx::query_as::<_, FaqRow>("SELECT * FROM faqs WHERE id = ? LIMIT 1")
        .bind(path.into_inner())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(ok_data(row))
}

#[derive(Debug, Deserialize)]
struct FaqUpdate {
    slug: Option<String>,
    question: Option<String>,
    answer: Option<String>,
    category: Option<String>,
    display_order: Option<i64>,
    published: Option<bool>,
}

async fn update_faq(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<FaqUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = sqlx::query_as::<_, FaqRow>("SELECT * FROM faqs WHERE id = ? LIMIT 1")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Some(slug) = payload.slug.as_deref() {
        require_slug(slug.trim())?;
    }

    let slug = payload.slug.map(|s| s.trim().to_string()).unwrap_or(existing.slug);
    let question = payload.question.unwrap_or(existing.question);
    let answer = payload.answer.unwrap_or(existing.answer);
    let category = payload.category.unwrap_or(existing.category);
    let display_order = payload.display_order.unwrap_or(existing.display_order);
    let published = payload.published.unwrap_or(existing.published);

    sqlx::query(
        r#"UPDATE faqs
           SET slug = ?, question = ?, answer = ?, category = ?, display_order = ?,
               published = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&slug)
    .bind(&question)
    .bind(&answer)
    .bind(&category)
    .bind(display_order)
    .bind(published)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, FaqRow>("SELECT * FROM faqs WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn delete_faq(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM faqs WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// Instagram mirrors
// ---------------------------------------------------------------------------

async fn list_instagram(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, limit, offset) = query.paging();
    let rows = sqlx::query_as::<_, InstagramPostRow>(
        "SELECT * FROM instagram_posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;
    let total = scalar(&state.db, "SELECT COUNT(*) FROM instagram_posts").await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination_json(page, limit, total),
    })))
}

#[derive(Debug, Deserialize)]
struct InstagramCreate {
    slug: String,
    title: String,
    caption: Option<String>,
    image_url: String,
    permalink: Option<String>,
    published: Option<bool>,
}

async fn create_instagram(
    state: web::Data<AppState>,
    payload: web::Json<InstagramCreate>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.title.trim().is_empty() || payload.image_url.trim().is_empty() {
        return Err(ApiError::Validation(
            "제목과 이미지 주소는 필수입니다.".to_string(),
        ));
    }
    require_slug(payload.slug.trim())?;

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO instagram_posts
           (id, slug, title, caption, image_url, permalink, likes, published, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(payload.slug.trim())
    .bind(payload.title.trim())
    .bind(none_if_blank(payload.caption))
    .bind(payload.image_url.trim())
    .bind(none_if_blank(payload.permalink))
    .bind(payload.published.unwrap_or(false))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, InstagramPostRow>("SELECT * FROM instagram_posts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

async fn get_instagram(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row =
        sqlx::query_as::<_, InstagramPostRow>("SELECT * FROM instagram_posts WHERE id = ? LIMIT 1")
            .bind(path.into_inner())
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(ApiError::not_found)?;
    Ok(ok_data(row))
}

#[derive(Debug, Deserialize)]
struct InstagramUpdate {
    slug: Option<String>,
    title: Option<String>,
    caption: Option<String>,
    image_url: Option<String>,
    permalink: Option<String>,
    published: Option<bool>,
}

async fn update_instagram(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<InstagramUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing =
        sqlx::query_as::<_, InstagramPostRow>("SELECT * FROM instagram_posts WHERE id = ? LIMIT 1")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(ApiError::not_found)?;

    if let Some(slug) = payload.slug.as_deref() {
        require_slug(slug.trim())?;
    }

    let slug = payload.slug.map(|s| s.trim().to_string()).unwrap_or(existing.slug);
    let title = payload.title.unwrap_or(existing.title);
    let caption = payload.caption.or(existing.caption);
    let image_url = payload.image_url.unwrap_or(existing.image_url);
    let permalink = payload.permalink.or(existing.permalink);
    let published = payload.published.unwrap_or(existing.published);

    sqlx::query(
        r#"UPDATE instagram_posts
           SET slug = ?, title = ?, caption = ?, image_url = ?, permalink = ?,
               published = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&slug)
    .bind(&title)
    .bind(&caption)
    .bind(&image_url)
    .bind(&permalink)
    .bind(published)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, InstagramPostRow>("SELECT * FROM instagram_posts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn delete_instagram(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM instagram_posts WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// Testimonial cases and evidence photos
// ---------------------------------------------------------------------------

async fn list_testimonials(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            sqlx::query_as::<_, TestimonialCaseRow>(
                r#"SELECT * FROM testimonial_cases WHERE category = ?
                   ORDER BY display_order ASC, created_at DESC"#,
            )
            .bind(category)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, TestimonialCaseRow>(
                "SELECT * FROM testimonial_cases ORDER BY display_order ASC, created_at DESC",
            )
            .fetch_all(&state.db)
            .await?
        }
    };
    Ok(ok_data(rows))
}

#[derive(Debug, Deserialize)]
struct TestimonialCreate {
    category: String,
    highlight_text: String,
    client_initial: String,
    full_story: Option<String>,
    case_date: String,
    attorney_name: Option<String>,
    consent_given: Option<bool>,
    published: Option<bool>,
    display_order: Option<i64>,
}

async fn create_testimonial(
    state: web::Data<AppState>,
    payload: web::Json<TestimonialCreate>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if !TESTIMONIAL_CATEGORIES.contains(&payload.category.as_str()) {
        return Err(ApiError::Validation("후기 카테고리가 올바르지 않습니다.".to_string()));
    }
    if payload.highlight_text.trim().is_empty()
        || payload.client_initial.trim().is_empty()
        || payload.case_date.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "대표 문구, 의뢰인 이니셜, 사건 시기는 필수입니다.".to_string(),
        ));
    }

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO testimonial_cases
           (id, category, highlight_text, client_initial, full_story, case_date,
            attorney_name, consent_given, published, display_order, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&payload.category)
    .bind(payload.highlight_text.trim())
    .bind(payload.client_initial.trim())
    .bind(none_if_blank(payload.full_story))
    .bind(payload.case_date.trim())
    .bind(none_if_blank(payload.attorney_name))
    .bind(payload.consent_given.unwrap_or(false))
    .bind(payload.published.unwrap_or(false))
    .bind(payload.display_order.unwrap_or(0))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, TestimonialCaseRow>(
        "SELECT * FROM testimonial_cases WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

async fn get_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let row = sqlx::query_as::<_, TestimonialCaseRow>(
        "SELECT * FROM testimonial_cases WHERE id = ? LIMIT 1",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(ApiError::not_found)?;

    let photos = sqlx::query_as::<_, EvidencePhotoRow>(
        "SELECT * FROM evidence_photos WHERE case_id = ? ORDER BY display_order ASC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "case": row, "evidence_photos": photos },
    })))
}

#[derive(Debug, Deserialize)]
struct TestimonialUpdate {
    category: Option<String>,
    highlight_text: Option<String>,
    client_initial: Option<String>,
    full_story: Option<String>,
    case_date: Option<String>,
    attorney_name: Option<String>,
    consent_given: Option<bool>,
    published: Option<bool>,
    display_order: Option<i64>,
}

async fn update_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<TestimonialUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = sqlx::query_as::<_, TestimonialCaseRow>(
        "SELECT * FROM testimonial_cases WHERE id = ? LIMIT 1",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(ApiError::not_found)?;

    if let Some(category) = payload.category.as_deref() {
        if !TESTIMONIAL_CATEGORIES.contains(&category) {
            return Err(ApiError::Validation("후기 카테고리가 올바르지 않습니다.".to_string()));
        }
    }

    let category = payload.category.unwrap_or(existing.category);
    let highlight_text = payload.highlight_text.unwrap_or(existing.highlight_text);
    let client_initial = payload.client_initial.unwrap_or(existing.client_initial);
    let full_story = payload.full_story.or(existing.full_story);
    let case_date = payload.case_date.unwrap_or(existing.case_date);
    let attorney_name = payload.attorney_name.or(existing.attorney_name);
    let consent_given = payload.consent_given.unwrap_or(existing.consent_given);
    let published = payload.published.unwrap_or(existing.published);
    let display_order = payload.display_order.unwrap_or(existing.display_order);

    sqlx::query(
        r#"UPDATE testimonial_cases
           SET category = ?, highlight_text = ?, client_initial = ?, full_story = ?,
               case_date = ?, attorney_name = ?, consent_given = ?, published = ?,
               display_order = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&category)
    .bind(&highlight_text)
    .bind(&client_initial)
    .bind(&full_story)
    .bind(&case_date)
    .bind(&attorney_name)
    .bind(consent_given)
    .bind(published)
    .bind(display_order)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, TestimonialCaseRow>(
        "SELECT * FROM testimonial_cases WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;
    Ok(ok_data(row))
}

/// Hard delete; the evidence photos go with it via the FK cascade.
async fn delete_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM testimonial_cases WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

#[derive(Debug, Deserialize)]
struct EvidencePhotoCreate {
    case_id: String,
    evidence_type: Option<String>,
    photo_url: String,
    caption: Option<String>,
    display_order: Option<i64>,
}

async fn create_evidence_photo(
    state: web::Data<AppState>,
    payload: web::Json<EvidencePhotoCreate>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.photo_url.trim().is_empty() {
        return Err(ApiError::Validation("사진 주소는 필수입니다.".to_string()));
    }

    let evidence_type = payload.evidence_type.unwrap_or_else(|| "other".to_string());
    if !EVIDENCE_TYPES.contains(&evidence_type.as_str()) {
        return Err(ApiError::Validation("증빙 유형이 올바르지 않습니다.".to_string()));
    }

    let case_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM testimonial_cases WHERE id = ?")
            .bind(&payload.case_id)
            .fetch_one(&state.db)
            .await?;
    if case_exists == 0 {
        return Err(ApiError::not_found());
    }

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO evidence_photos
           (id, case_id, evidence_type, photo_url, caption, display_order, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&payload.case_id)
    .bind(&evidence_type)
    .bind(payload.photo_url.trim())
    .bind(none_if_blank(payload.caption))
    .bind(payload.display_order.unwrap_or(0))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, EvidencePhotoRow>("SELECT * FROM evidence_photos WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": row })))
}

#[derive(Debug, Deserialize)]
struct ReorderItem {
    id: String,
    display_order: i64,
}

async fn reorder_evidence_photos(
    state: web::Data<AppState>,
    payload: web::Json<Vec<ReorderItem>>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now().to_rfc3339();
    for item in payload.into_inner() {
        sqlx::query("UPDATE evidence_photos SET display_order = ?, updated_at = ? WHERE id = ?")
            .bind(item.display_order)
            .bind(&now)
            .bind(&item.id)
            .execute(&state.db)
            .await?;
    }
    Ok(ok_deleted())
}

async fn delete_evidence_photo(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM evidence_photos WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found());
    }
    Ok(ok_deleted())
}

// ---------------------------------------------------------------------------
// SMS templates and logs
// ---------------------------------------------------------------------------

async fn list_sms_templates(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, SmsTemplateRow>(
        "SELECT * FROM sms_templates ORDER BY office ASC, template_type ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(ok_data(rows))
}

#[derive(Debug, Deserialize)]
struct SmsTemplateUpdate {
    name: Option<String>,
    content: Option<String>,
    message_type: Option<String>,
    is_active: Option<bool>,
}

async fn update_sms_template(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<SmsTemplateUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing =
        sqlx::query_as::<_, SmsTemplateRow>("SELECT * FROM sms_templates WHERE id = ? LIMIT 1")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(ApiError::not_found)?;

    if let Some(message_type) = payload.message_type.as_deref() {
        if message_type != "SMS" && message_type != "LMS" {
            return Err(ApiError::Validation("메시지 유형이 올바르지 않습니다.".to_string()));
        }
    }

    let name = payload.name.unwrap_or(existing.name);
    let content = payload.content.unwrap_or(existing.content);
    let message_type = payload.message_type.unwrap_or(existing.message_type);
    let is_active = payload.is_active.unwrap_or(existing.is_active);

    sqlx::query(
        r#"UPDATE sms_templates
           SET name = ?, content = ?, message_type = ?, is_active = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&name)
    .bind(&content)
    .bind(&message_type)
    .bind(is_active)
    .bind(Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = sqlx::query_as::<_, SmsTemplateRow>("SELECT * FROM sms_templates WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(ok_data(row))
}

async fn list_sms_logs(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, limit, offset) = query.paging();
    let rows = sqlx::query_as::<_, SmsLogRow>(
        "SELECT * FROM sms_logs ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;
    let total = scalar(&state.db, "SELECT COUNT(*) FROM sms_logs").await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination_json(page, limit, total),
    })))
}

async fn resend_sms(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = sms::resend(&state, &path.into_inner()).await?;
    Ok(ok_data(row))
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

async fn list_activities(
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT * FROM activities ORDER BY created_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;
    Ok(ok_data(rows))
}
