// src/core/services/verification.rs
//! Bearer-token verification against the identity provider.
//!
//! The provider issues RS256 ID tokens for a single project. Tokens are checked
//! against the provider's published signing keys, which are cached and
//! refreshed when they age out or when a token names a key id the cache has
//! never seen.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{core::identity::types::IdentityClaims, utils::config::AuthConfig};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Allowed clock skew when checking `exp` and `iat`, in seconds.
const CLOCK_SKEW_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("credential error: {0}")]
    Credentials(String),

    #[error("signing key fetch failed: {0}")]
    KeyFetch(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Resolves a bearer token to the identity it was issued for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerificationError>;
}

/// The parts of a service-account credential file the verifier relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type")]
    pub account_type: String,
    pub project_id: String,
    pub client_email: String,
}

impl ServiceAccountCredentials {
    pub fn load(path: &Path) -> Result<Self, VerificationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VerificationError::Credentials(format!(
                "cannot read credential file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, VerificationError> {
        let credentials: Self = serde_json::from_str(raw)
            .map_err(|e| VerificationError::Credentials(format!("malformed credential file: {e}")))?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> Result<(), VerificationError> {
        if self.account_type != "service_account" {
            return Err(VerificationError::Credentials(format!(
                "expected a service_account credential, got '{}'",
                self.account_type
            )));
        }
        if self.project_id.trim().is_empty() {
            return Err(VerificationError::Credentials("project_id is empty".into()));
        }
        if self.client_email.trim().is_empty() {
            return Err(VerificationError::Credentials("client_email is empty".into()));
        }
        Ok(())
    }
}

/// JWKS response format (RFC 7517).
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    alg: Option<String>,
}

/// Keeps the RSA keys with a usable id and an RS256 (or unspecified) algorithm.
fn signing_keys(document: &JwksDocument) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in &document.keys {
        if jwk.kty != "RSA" {
            continue;
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            warn!(kid = ?jwk.kid, alg = ?jwk.alg, "Skipping signing key with unsupported algorithm");
            continue;
        }
        let (Some(kid), Some(n), Some(e)) = (&jwk.kid, &jwk.n, &jwk.e) else {
            continue;
        };
        match DecodingKey::from_rsa_components(n, e) {
            Ok(key) => {
                keys.insert(kid.clone(), key);
            }
            Err(err) => warn!(kid = %kid, error = %err, "Failed to parse signing key components"),
        }
    }
    keys
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

enum KeySource {
    Remote {
        url: String,
        client: reqwest::Client,
        refresh_interval: Duration,
        max_stale: Duration,
    },
    Fixed,
}

/// Signing keys of the identity provider.
pub struct SigningKeyStore {
    cache: RwLock<Option<CachedKeys>>,
    refresh_lock: Mutex<()>,
    source: KeySource,
}

impl SigningKeyStore {
    /// Fetches the key set once up front so a broken endpoint fails startup.
    ///
    /// When a later refresh fails, cached keys stay usable until they are
    /// `refresh_interval + max_stale` old. A zero `max_stale` disables that.
    pub async fn remote(
        url: impl Into<String>,
        refresh_interval: Duration,
        max_stale: Duration,
        timeout: Duration,
    ) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerificationError::KeyFetch(format!("cannot build HTTP client: {e}")))?;

        let store = Self {
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            source: KeySource::Remote {
                url: url.into(),
                client,
                refresh_interval,
                max_stale,
            },
        };
        store.refresh().await?;
        Ok(store)
    }

    /// A key set that never refreshes.
    pub fn fixed(keys: HashMap<String, DecodingKey>) -> Self {
        Self {
            cache: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
            refresh_lock: Mutex::new(()),
            source: KeySource::Fixed,
        }
    }

    /// A fixed key set parsed from a JWKS document.
    pub fn from_jwks_json(raw: &str) -> Result<Self, VerificationError> {
        let document: JwksDocument = serde_json::from_str(raw)
            .map_err(|e| VerificationError::KeyFetch(format!("malformed JWKS document: {e}")))?;
        Ok(Self::fixed(signing_keys(&document)))
    }

    fn within_stale_window(&self, entry: &CachedKeys) -> bool {
        match &self.source {
            KeySource::Remote {
                refresh_interval,
                max_stale,
                ..
            } => !max_stale.is_zero() && entry.fetched_at.elapsed() < *refresh_interval + *max_stale,
            KeySource::Fixed => true,
        }
    }

    fn is_fresh(&self, entry: &CachedKeys) -> bool {
        match &self.source {
            KeySource::Remote { refresh_interval, .. } => entry.fetched_at.elapsed() < *refresh_interval,
            KeySource::Fixed => true,
        }
    }

    async fn lookup_fresh(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| self.is_fresh(entry))
            .and_then(|entry| entry.keys.get(kid).cloned())
    }

    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, VerificationError> {
        if let Some(key) = self.lookup_fresh(kid).await {
            return Ok(key);
        }
        if matches!(self.source, KeySource::Fixed) {
            return Err(VerificationError::InvalidToken(format!("unknown signing key '{kid}'")));
        }

        // Only one caller refreshes; the rest re-check once it is done.
        let _guard = self.refresh_lock.lock().await;
        if let Some(key) = self.lookup_fresh(kid).await {
            return Ok(key);
        }

        match self.refresh().await {
            Ok(()) => self
                .cache
                .read()
                .await
                .as_ref()
                .and_then(|entry| entry.keys.get(kid).cloned())
                .ok_or_else(|| VerificationError::InvalidToken(format!("unknown signing key '{kid}'"))),
            Err(refresh_err) => {
                let cache = self.cache.read().await;
                let stale = cache
                    .as_ref()
                    .filter(|entry| self.within_stale_window(entry))
                    .and_then(|entry| entry.keys.get(kid).cloned().map(|key| (key, entry.fetched_at.elapsed())));
                match stale {
                    Some((key, age)) => {
                        warn!(
                            error = %refresh_err,
                            staleness_secs = age.as_secs(),
                            "Signing key refresh failed, using stale cache"
                        );
                        Ok(key)
                    }
                    None => Err(refresh_err),
                }
            }
        }
    }

    async fn refresh(&self) -> Result<(), VerificationError> {
        let KeySource::Remote { url, client, .. } = &self.source else {
            return Ok(());
        };
        debug!(url = %url, "Fetching signing keys");

        let response = client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                error!(url = %url, error = %e, "Signing key fetch failed");
                VerificationError::KeyFetch(e.to_string())
            })?;

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| VerificationError::KeyFetch(format!("malformed JWKS document: {e}")))?;

        let keys = signing_keys(&document);
        if keys.is_empty() {
            return Err(VerificationError::KeyFetch(format!("no usable signing keys at {url}")));
        }
        debug!(count = keys.len(), "Signing keys refreshed");

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: u64,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies ID tokens minted for one provider project.
pub struct FirebaseTokenVerifier {
    project_id: String,
    issuer: String,
    keys: SigningKeyStore,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: impl Into<String>, keys: SigningKeyStore) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            project_id,
            keys,
        }
    }

    /// Loads the credential file and the provider's signing keys.
    ///
    /// Any failure here is fatal to the process.
    pub async fn from_config(
        config: &AuthConfig,
        refresh_interval: Duration,
        max_stale: Duration,
        timeout: Duration,
    ) -> Result<Self, VerificationError> {
        let credentials = ServiceAccountCredentials::load(&config.credentials_path)?;
        let keys = SigningKeyStore::remote(&config.jwks_url, refresh_interval, max_stale, timeout).await?;

        info!(
            project_id = %credentials.project_id,
            client_email = %credentials.client_email,
            "Identity provider credentials loaded"
        );
        Ok(Self::new(credentials.project_id, keys))
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerificationError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerificationError::InvalidToken(format!(
                "unexpected signing algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerificationError::InvalidToken("token has no key id".into()))?;
        let key = self.keys.get_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdTokenClaims>(token, &key, &validation)?.claims;

        if claims.sub.is_empty() {
            return Err(VerificationError::InvalidToken("token has an empty subject".into()));
        }
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if claims.iat > now + CLOCK_SKEW_SECS {
            return Err(VerificationError::InvalidToken("token issued in the future".into()));
        }

        debug!(uid = %claims.sub, "Token verified");
        Ok(IdentityClaims {
            uid: claims.sub,
            email: claims.email,
        })
    }
}
