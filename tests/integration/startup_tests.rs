// tests/integration/startup_tests.rs
use face_enrollment_node::{
    core::services::verification::{FirebaseTokenVerifier, ServiceAccountCredentials},
    utils::{config::Config, error::NodeError},
    Application,
};

#[tokio::test]
async fn test_missing_credentials_abort_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_defaults().unwrap();
    config.storage.root_dir = dir.path().join("data");
    config.auth.credentials_path = dir.path().join("absent.json");

    let result = Application::new(config).await;
    assert!(matches!(result, Err(NodeError::Identity(_))));
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn test_invalid_credentials_abort_startup() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");
    std::fs::write(&credentials, r#"{"type": "authorized_user", "project_id": "x"}"#).unwrap();

    let mut config = Config::with_defaults().unwrap();
    config.auth.credentials_path = credentials.clone();

    let err = FirebaseTokenVerifier::from_config(
        &config.auth,
        config.get_key_refresh_interval(),
        config.get_key_max_stale(),
        config.get_http_timeout(),
    )
    .await
    .err()
    .expect("startup must fail");
    assert!(err.to_string().contains("credential"));
    assert!(ServiceAccountCredentials::load(&credentials).is_err());
}

#[tokio::test]
async fn test_storage_root_created_on_startup() {
    let ctx = crate::common::TestContext::new().await;
    assert!(ctx.data_root().is_dir());
}
