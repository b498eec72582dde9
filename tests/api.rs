use actix_web::{http::StatusCode, test, web, App};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use theyool_api::{
    configure_api, db, json_error_handler,
    state::{AppState, SmsConfig},
};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "test-password";
const CRON_SECRET: &str = "cron-secret";

async fn test_state() -> AppState {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("connect options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("pool");

    db::run_migrations(&pool).await.expect("migrations");
    db::create_admin(&pool, ADMIN_EMAIL, "관리자", ADMIN_PASSWORD)
        .await
        .expect("admin");
    // Admin already exists, so this only seeds the default SMS templates.
    db::seed_defaults(&pool).await.expect("seed");

    AppState {
        db: pool,
        sms: SmsConfig {
            api_key: String::new(),
            api_secret: String::new(),
            from_number: String::new(),
            api_base: String::new(),
        },
        cron_secret: Some(CRON_SECRET.to_string()),
    }
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .configure(configure_api),
        )
        .await
    };
}

fn tomorrow() -> String {
    (Local::now().date_naive() + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

macro_rules! login {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.response()
            .cookies()
            .find(|c| c.name() == "theyool_session")
            .expect("session cookie")
            .into_owned()
    }};
}

#[actix_web::test]
async fn intake_creates_pending_consultation() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(json!({
            "request_type": "callback",
            "name": "테스트",
            "phone": "010-1234-5678",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["name"], json!("테스트"));
}

#[actix_web::test]
async fn intake_with_missing_or_unknown_fields_is_rejected() {
    let state = test_state().await;
    let app = init_app!(state.clone());

    // Missing phone.
    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(json!({ "request_type": "callback", "name": "테스트" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));

    // Unknown field.
    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(json!({
            "request_type": "callback",
            "name": "테스트",
            "phone": "010-1234-5678",
            "lead_score": 10,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted either way.
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM consultations")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[actix_web::test]
async fn overlapping_booking_is_a_conflict() {
    let state = test_state().await;
    let app = init_app!(state);

    let booking = |time: &str| {
        json!({
            "request_type": "visit",
            "name": "테스트",
            "phone": "010-1234-5678",
            "preferred_date": tomorrow(),
            "preferred_time": time,
            "office_location": "천안",
        })
    };

    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(booking("10:00"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(booking("10:30"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn admin_endpoints_require_a_session() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/admin/consultations")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Bad credentials never yield a cookie.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_status_patch_is_reflected_on_read() {
    let state = test_state().await;
    let app = init_app!(state);
    let cookie = login!(&app);

    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(json!({
            "request_type": "callback",
            "name": "테스트",
            "phone": "010-1234-5678",
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/consultations/{id}"))
        .cookie(cookie.clone())
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/consultations/{id}"))
        .cookie(cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], json!("completed"));
}

#[actix_web::test]
async fn blog_slug_round_trip_and_duplicate_conflict() {
    let state = test_state().await;
    let app = init_app!(state);
    let cookie = login!(&app);

    let post = json!({
        "title": "이혼 소송 절차",
        "slug": "divorce-process",
        "content": "본문입니다.",
        "published": true,
    });

    let req = test::TestRequest::post()
        .uri("/api/admin/blog")
        .cookie(cookie.clone())
        .set_json(post.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Public read by slug returns the same content.
    let req = test::TestRequest::get()
        .uri("/api/blog/divorce-process")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], json!("이혼 소송 절차"));
    assert_eq!(body["data"]["content"], json!("본문입니다."));

    // Second create with the same slug hits the unique constraint.
    let req = test::TestRequest::post()
        .uri("/api/admin/blog")
        .cookie(cookie)
        .set_json(post)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unpublished_content_stays_private() {
    let state = test_state().await;
    let app = init_app!(state);
    let cookie = login!(&app);

    let req = test::TestRequest::post()
        .uri("/api/admin/blog")
        .cookie(cookie)
        .set_json(json!({
            "title": "초안",
            "slug": "draft-post",
            "content": "아직 공개 전",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/blog/draft-post").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/blog").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn deleting_a_testimonial_cascades_its_photos() {
    let state = test_state().await;
    let app = init_app!(state.clone());
    let cookie = login!(&app);

    let req = test::TestRequest::post()
        .uri("/api/admin/testimonial-cases")
        .cookie(cookie.clone())
        .set_json(json!({
            "category": "alimony",
            "highlight_text": "위자료 2억 승소",
            "client_initial": "김",
            "case_date": "2024년 10월",
            "consent_given": true,
            "published": true,
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let case_id = body["data"]["id"].as_str().unwrap().to_string();

    for order in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/admin/evidence-photos")
            .cookie(cookie.clone())
            .set_json(json!({
                "case_id": case_id,
                "evidence_type": "kakao",
                "photo_url": format!("https://cdn.example.com/photo-{order}.jpg"),
                "display_order": order,
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evidence_photos WHERE case_id = ?")
        .bind(&case_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count.0, 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/testimonial-cases/{case_id}"))
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evidence_photos WHERE case_id = ?")
        .bind(&case_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[actix_web::test]
async fn blocked_time_invariants_and_intake_rejection() {
    let state = test_state().await;
    let app = init_app!(state);
    let cookie = login!(&app);
    let date = tomorrow();

    // time_slot without an end bound is malformed.
    let req = test::TestRequest::post()
        .uri("/api/admin/blocked-times")
        .cookie(cookie.clone())
        .set_json(json!({
            "block_type": "time_slot",
            "blocked_date": date,
            "blocked_time_start": "12:00",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // An inverted range is malformed too.
    let req = test::TestRequest::post()
        .uri("/api/admin/blocked-times")
        .cookie(cookie.clone())
        .set_json(json!({
            "block_type": "time_slot",
            "blocked_date": date,
            "blocked_time_start": "15:00",
            "blocked_time_end": "14:00",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // A whole-day block at one office.
    let req = test::TestRequest::post()
        .uri("/api/admin/blocked-times")
        .cookie(cookie)
        .set_json(json!({
            "block_type": "date",
            "blocked_date": date,
            "office_location": "평택",
            "reason": "휴무",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/consultations")
        .set_json(json!({
            "request_type": "visit",
            "name": "테스트",
            "phone": "010-1234-5678",
            "preferred_date": date,
            "preferred_time": "11:00",
            "office_location": "평택",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn cron_endpoints_require_the_shared_secret() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post().uri("/api/cron/auto-confirm").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/cron/auto-confirm")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/cron/auto-confirm")
        .insert_header(("Authorization", format!("Bearer {CRON_SECRET}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["total_processed"], json!(0));
}

#[actix_web::test]
async fn instagram_like_counts_published_posts_only() {
    let state = test_state().await;
    let app = init_app!(state);
    let cookie = login!(&app);

    let req = test::TestRequest::post()
        .uri("/api/admin/instagram")
        .cookie(cookie)
        .set_json(json!({
            "slug": "office-tour",
            "title": "사무실 투어",
            "image_url": "https://cdn.example.com/insta.jpg",
            "published": true,
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/instagram/office-tour/like")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["likes"], json!(1));

    let req = test::TestRequest::post()
        .uri("/api/instagram/missing-post/like")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
