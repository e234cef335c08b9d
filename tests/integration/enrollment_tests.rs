// tests/integration/enrollment_tests.rs
use actix_web::{http::header, http::StatusCode, test, web, App};
use face_enrollment_node::api::{
    self,
    handlers::enrollment::EnrollmentLimits,
    types::{EnrollmentResponse, ErrorResponse},
};
use serde_json::json;

use crate::common::{data_url_images, photo_bytes, raw_images, sign_token, TestContext};

const ANGLES: [&str; 5] = ["frontal", "left", "right", "up", "down"];

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .wrap(api::cors())
                .app_data(web::Data::from($ctx.service()))
                .app_data(web::Data::new(EnrollmentLimits {
                    max_payload_bytes: 1 << 20,
                }))
                .configure(api::configure),
        )
        .await
    };
}

fn enroll_request(token: Option<&str>, images: Vec<String>) -> test::TestRequest {
    let mut req = test::TestRequest::post()
        .uri("/enroll")
        .set_json(json!({ "images": images }));
    if let Some(token) = token {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {}", token)));
    }
    req
}

#[actix_web::test]
async fn test_campus_enrollment_end_to_end() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("nnm24cs124@nmamit.in", 3600);

    let resp = test::call_service(&app, enroll_request(Some(token.as_str()), data_url_images(5)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: EnrollmentResponse = test::read_body_json(resp).await;
    let directory = ctx.data_root().join("CS").join("CS_124");
    assert_eq!(body.status, "success");
    assert_eq!(body.path, directory.display().to_string());

    for (i, angle) in ANGLES.iter().enumerate() {
        let stored = std::fs::read(directory.join(format!("{}.jpg", angle))).unwrap();
        assert_eq!(stored, photo_bytes(i), "{} photo differs", angle);
    }
    assert_eq!(std::fs::read_dir(&directory).unwrap().count(), 5);
}

#[actix_web::test]
async fn test_other_domain_goes_to_unknown_branch() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("jane.doe@otherdomain.com", 3600);

    let resp = test::call_service(&app, enroll_request(Some(token.as_str()), raw_images(5)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: EnrollmentResponse = test::read_body_json(resp).await;
    assert_eq!(body.message, "Enrollment saved for jane_doe under branch UNKNOWN");
    assert!(ctx.data_root().join("UNKNOWN/jane_doe/down.jpg").is_file());
}

#[actix_web::test]
async fn test_resubmission_overwrites() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("nnm24ec042@nmamit.in", 3600);

    let first = test::call_service(&app, enroll_request(Some(token.as_str()), raw_images(5)).to_request()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let mut second_images = raw_images(5);
    second_images.reverse();
    let second = test::call_service(&app, enroll_request(Some(token.as_str()), second_images).to_request()).await;
    assert_eq!(second.status(), StatusCode::OK);

    let frontal = std::fs::read(ctx.data_root().join("EC/EC_042/frontal.jpg")).unwrap();
    assert_eq!(frontal, photo_bytes(4));
}

#[actix_web::test]
async fn test_missing_or_malformed_header_never_reaches_verifier() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let resp = test::call_service(&app, enroll_request(None, raw_images(5)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/enroll")
        .insert_header((header::AUTHORIZATION, "Token abc"))
        .set_json(json!({ "images": raw_images(5) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.message, "missing token");
    assert_eq!(ctx.verifier.calls(), 0);
}

#[actix_web::test]
async fn test_expired_token_writes_nothing() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("nnm24cs124@nmamit.in", -3600);

    let resp = test::call_service(&app, enroll_request(Some(token.as_str()), raw_images(5)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, "error");
    assert!(body.message.starts_with("authentication failed: "));
    assert_eq!(ctx.verifier.calls(), 1);
    assert_eq!(std::fs::read_dir(ctx.data_root()).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_wrong_image_count_reports_actual_count() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("nnm24cs124@nmamit.in", 3600);

    for count in [0, 4, 6] {
        let resp = test::call_service(&app, enroll_request(Some(token.as_str()), raw_images(count)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, format!("expected 5 images, got {}", count));
    }
}

#[actix_web::test]
async fn test_missing_images_key() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);
    let token = sign_token("nnm24cs124@nmamit.in", 3600);

    let req = test::TestRequest::post()
        .uri("/enroll")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_json(json!({ "photos": raw_images(5) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.message, "missing images");
}

#[actix_web::test]
async fn test_health_and_cors() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header((header::ORIGIN, "https://attendance.example.org"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_data_url_and_raw_submissions_store_identical_bytes() {
    let ctx = TestContext::new().await;
    let service = ctx.service();

    let data_url_body = serde_json::to_vec(&json!({ "images": data_url_images(5) })).unwrap();
    let raw_body = serde_json::to_vec(&json!({ "images": raw_images(5) })).unwrap();

    let first_token = format!("Bearer {}", sign_token("aa111@nmamit.in", 3600));
    let second_token = format!("Bearer {}", sign_token("bb222@nmamit.in", 3600));
    let first = service.enroll(Some(first_token.as_str()), &data_url_body).await.unwrap();
    let second = service.enroll(Some(second_token.as_str()), &raw_body).await.unwrap();

    for angle in ANGLES {
        let file = format!("{}.jpg", angle);
        assert_eq!(
            std::fs::read(first.directory.join(&file)).unwrap(),
            std::fs::read(second.directory.join(&file)).unwrap()
        );
    }
}
