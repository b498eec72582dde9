use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{
        authenticate_credentials, clear_session_cookie, create_session, destroy_session,
        session_cookie, SESSION_COOKIE,
    },
    booking::{create_consultation, IntakeRequest},
    db,
    error::ApiError,
    models::{
        BlogPostRow, EvidencePhotoRow, FaqRow, InstagramPostRow, LegalCaseRow, TestimonialCaseRow,
    },
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/consultations").route(web::post().to(submit_consultation)))
        .service(web::resource("/api/auth/login").route(web::post().to(login)))
        .service(web::resource("/api/auth/logout").route(web::post().to(logout)))
        .service(web::resource("/api/blog").route(web::get().to(list_blog)))
        .service(web::resource("/api/blog/{slug}").route(web::get().to(get_blog_post)))
        .service(web::resource("/api/cases").route(web::get().to(list_cases)))
        .service(web::resource("/api/cases/{slug}").route(web::get().to(get_case)))
        .service(web::resource("/api/faqs").route(web::get().to(list_faqs)))
        .service(web::resource("/api/testimonials").route(web::get().to(list_testimonials)))
        .service(web::resource("/api/instagram").route(web::get().to(list_instagram)))
        .service(web::resource("/api/instagram/{slug}/like").route(web::post().to(like_instagram)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn submit_consultation(
    state: web::Data<AppState>,
    payload: web::Json<IntakeRequest>,
) -> Result<HttpResponse, ApiError> {
    let row = create_consultation(&state.db, payload.into_inner()).await?;

    db::log_activity(
        &state.db,
        "consultation_created",
        &format!("{} 님의 상담 신청이 접수되었습니다.", row.name),
        None,
        Some(&row.id),
    )
    .await;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": row,
        "message": "상담 신청이 완료되었습니다",
    })))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = match authenticate_credentials(&state.db, payload.email.trim(), &payload.password)
        .await
    {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized().json(json!({
                "success": false,
                "message": "이메일 또는 비밀번호가 올바르지 않습니다.",
            })));
        }
    };

    let token = create_session(&state.db, &user.id).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&req, &token))
        .json(json!({ "success": true, "message": "로그인 성공" })))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        destroy_session(&state.db, cookie.value()).await;
    }

    HttpResponse::Ok()
        .cookie(clear_session_cookie(&req))
        .json(json!({ "success": true }))
}

#[derive(Debug, Deserialize)]
struct PublicListQuery {
    category: Option<String>,
    limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, 100)
}

async fn list_blog(
    state: web::Data<AppState>,
    query: web::Query<PublicListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = clamp_limit(query.limit, 20);
    let rows = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            sqlx::query_as::<_, BlogPostRow>(
                r#"SELECT * FROM blog_posts
                   WHERE published = 1 AND category = ?
                   ORDER BY COALESCE(published_at, created_at) DESC
                   LIMIT ?"#,
            )
            .bind(category)
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, BlogPostRow>(
                r#"SELECT * FROM blog_posts
                   WHERE published = 1
                   ORDER BY COALESCE(published_at, created_at) DESC
                   LIMIT ?"#,
            )
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows })))
}

async fn get_blog_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let row = sqlx::query_as::<_, BlogPostRow>(
        "SELECT * FROM blog_posts WHERE slug = ? AND published = 1 LIMIT 1",
    )
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(ApiError::not_found)?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": row })))
}

async fn list_cases(
    state: web::Data<AppState>,
    query: web::Query<PublicListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = clamp_limit(query.limit, 50);
    let rows = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            sqlx::query_as::<_, LegalCaseRow>(
                r#"SELECT * FROM legal_cases
                   WHERE published = 1 AND category = ?
                   ORDER BY created_at DESC
                   LIMIT ?"#,
            )
            .bind(category)
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, LegalCaseRow>(
                "SELECT * FROM legal_cases WHERE published = 1 ORDER BY created_at DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows })))
}

async fn get_case(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let row = sqlx::query_as::<_, LegalCaseRow>(
        "SELECT * FROM legal_cases WHERE slug = ? AND published = 1 LIMIT 1",
    )
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(ApiError::not_found)?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": row })))
}

async fn list_faqs(
    state: web::Data<AppState>,
    query: web::Query<PublicListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            sqlx::query_as::<_, FaqRow>(
                r#"SELECT * FROM faqs
                   WHERE published = 1 AND category = ?
                   ORDER BY display_order ASC, created_at ASC"#,
            )
            .bind(category)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, FaqRow>(
                "SELECT * FROM faqs WHERE published = 1 ORDER BY display_order ASC, created_at ASC",
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows })))
}

/// Published, consent-given stories with their evidence photos attached.
async fn list_testimonials(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let cases = sqlx::query_as::<_, TestimonialCaseRow>(
        r#"SELECT * FROM testimonial_cases
           WHERE published = 1 AND consent_given = 1
           ORDER BY display_order ASC, created_at DESC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let photos = sqlx::query_as::<_, EvidencePhotoRow>(
        r#"SELECT p.* FROM evidence_photos p
           JOIN testimonial_cases c ON c.id = p.case_id
           WHERE c.published = 1 AND c.consent_given = 1
           ORDER BY p.case_id, p.display_order ASC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let data: Vec<serde_json::Value> = cases
        .into_iter()
        .map(|case| {
            let case_photos: Vec<&EvidencePhotoRow> =
                photos.iter().filter(|p| p.case_id == case.id).collect();
            json!({
                "id": case.id,
                "category": case.category,
                "highlight_text": case.highlight_text,
                "client_initial": case.client_initial,
                "full_story": case.full_story,
                "case_date": case.case_date,
                "attorney_name": case.attorney_name,
                "evidence_photos": case_photos,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

async fn list_instagram(
    state: web::Data<AppState>,
    query: web::Query<PublicListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = clamp_limit(query.limit, 30);
    let rows = sqlx::query_as::<_, InstagramPostRow>(
        "SELECT * FROM instagram_posts WHERE published = 1 ORDER BY created_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows })))
}

async fn like_instagram(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let updated = sqlx::query(
        "UPDATE instagram_posts SET likes = likes + 1 WHERE slug = ? AND published = 1",
    )
    .bind(&slug)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found());
    }

    let likes: (i64,) = sqlx::query_as("SELECT likes FROM instagram_posts WHERE slug = ?")
        .bind(&slug)
        .fetch_one(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "slug": slug, "likes": likes.0 },
    })))
}
