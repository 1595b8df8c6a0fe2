use crate::config::ServiceAccountKey;
use crate::error::PullError;
use cached::{Cached, TimedCache};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

pub const BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh a little before the token server's usual one hour expiry.
const TOKEN_CACHE_SECS: u64 = 3540;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey, issued_at: i64) -> Self {
        AssertionClaims {
            iss: key.client_email.clone(),
            scope: READONLY_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>
}

/// Authorized client for the Analytics Data API, created once per run.
///
/// Holds the read-only service-account credentials and the property being
/// reported on. Access tokens are minted lazily and reused until shortly
/// before they expire.
pub struct AnalyticsClient {
    http: Client,
    api_base: String,
    property_id: String,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    tokens: Mutex<TimedCache<String, String>>
}

impl std::fmt::Debug for AnalyticsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsClient")
            .field("api_base", &self.api_base)
            .field("property_id", &self.property_id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl AnalyticsClient {
    pub fn new(property_id: &str, key: ServiceAccountKey) -> Result<Self, PullError> {
        Self::with_base_url(property_id, key, BASE_URL)
    }

    /// Like [`AnalyticsClient::new`], against a different Data API root.
    pub fn with_base_url(property_id: &str, key: ServiceAccountKey, api_base: &str) -> Result<Self, PullError> {
        if property_id.is_empty() {
            return Err(PullError::Configuration("Property id is required".to_string()));
        }
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| PullError::Configuration(format!("invalid service account private key: {}", e)))?;
        Ok(AnalyticsClient {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            property_id: property_id.to_string(),
            key,
            encoding_key,
            tokens: Mutex::new(TimedCache::with_lifespan(TOKEN_CACHE_SECS))
        })
    }

    fn signed_assertion(&self) -> Result<String, PullError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let claims = AssertionClaims::new(&self.key, Utc::now().timestamp());
        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    fn cached_token(&self) -> Option<String> {
        let mut tokens = self.tokens.lock().ok()?;
        tokens.cache_get(&self.key.client_email).cloned()
    }

    fn store_token(&self, token: &str, expires_in: Option<u64>) {
        // Tokens that would expire before the cache lifespan are not reused.
        if expires_in.is_some_and(|secs| secs < TOKEN_CACHE_SECS) {
            return;
        }
        if let Ok(mut tokens) = self.tokens.lock() {
            let _ = tokens.cache_set(self.key.client_email.clone(), token.to_string());
        }
    }

    /// Exchange a signed service-account assertion for a bearer token.
    pub async fn access_token(&self) -> Result<String, PullError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!("requesting access token for {}", self.key.client_email);
        let assertion = self.signed_assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(PullError::SourceQuery(format!(
                "token request failed with status {}: {}",
                status, response_text
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response_text)?;
        self.store_token(&token.access_token, token.expires_in);
        Ok(token.access_token)
    }

    /// POST a JSON body to `/properties/{id}{method}` and return the response text.
    pub async fn property_post<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<String, PullError> {
        let token = self.access_token().await?;
        let url = format!("{}/properties/{}{}", self.api_base, self.property_id, method);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(PullError::SourceQuery(format!(
                "API request failed with status {}: {}",
                status, response_text
            )));
        }

        Ok(response_text)
    }
}
