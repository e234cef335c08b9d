// tests/common/mod.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use face_enrollment_node::{
    core::{
        identity::IdentityClaims,
        services::{
            enrollment::EnrollmentService,
            verification::{FirebaseTokenVerifier, SigningKeyStore, TokenVerifier, VerificationError},
        },
    },
    utils::config::Config,
    Application,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tempfile::TempDir;

pub const PROJECT_ID: &str = "cam-attendance-test";
pub const KEY_ID: &str = "test-key-1";

const PRIVATE_KEY: &str = include_str!("../fixtures/test-signing-key.pem");
const JWKS: &str = include_str!("../fixtures/test-jwks.json");

#[derive(Serialize)]
struct IdTokenClaims<'a> {
    sub: &'a str,
    iss: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
    email: &'a str,
}

/// Signs an ID token for `email` with the fixture key.
pub fn sign_token(email: &str, expires_in_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = IdTokenClaims {
        sub: "integration-uid",
        iss: format!("https://securetoken.google.com/{}", PROJECT_ID),
        aud: PROJECT_ID,
        iat: now - 10,
        exp: now + expires_in_secs,
        email,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("fixture key parses");
    encode(&header, &claims, &key).expect("token encodes")
}

pub fn fixture_verifier() -> FirebaseTokenVerifier {
    let keys = SigningKeyStore::from_jwks_json(JWKS).expect("fixture JWKS parses");
    FirebaseTokenVerifier::new(PROJECT_ID, keys)
}

/// Wraps a verifier and counts how often it is consulted.
pub struct CountingVerifier<V> {
    inner: V,
    calls: AtomicUsize,
}

impl<V> CountingVerifier<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V: TokenVerifier> TokenVerifier for CountingVerifier<V> {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token).await
    }
}

/// Deterministic, distinct bytes per photo position.
pub fn photo_bytes(index: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend(std::iter::repeat(index as u8).take(32 + index));
    bytes
}

pub fn data_url_images(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("data:image/jpeg;base64,{}", STANDARD.encode(photo_bytes(i))))
        .collect()
}

pub fn raw_images(count: usize) -> Vec<String> {
    (0..count).map(|i| STANDARD.encode(photo_bytes(i))).collect()
}

pub struct TestContext {
    pub root: TempDir,
    pub verifier: Arc<CountingVerifier<FirebaseTokenVerifier>>,
    pub app: Application,
}

impl TestContext {
    pub async fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let mut config = Config::with_defaults().expect("default config");
        config.storage.root_dir = root.path().join("enrollment_data");

        let verifier = Arc::new(CountingVerifier::new(fixture_verifier()));
        let app = Application::with_verifier(config, verifier.clone())
            .await
            .expect("application builds");

        Self { root, verifier, app }
    }

    pub fn data_root(&self) -> std::path::PathBuf {
        self.root.path().join("enrollment_data")
    }

    pub fn service(&self) -> Arc<EnrollmentService> {
        self.app.enrollment_service()
    }
}
