//! Identity provider backed by the Firebase Identity Toolkit REST API.

use super::{AuthSession, Identity, IdentityProvider};
use crate::config::AuthSettings;
use crate::error::{MultitoolError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, instrument};

/// Error codes that mean the caller's credentials or token are wrong.
const AUTH_INVALID_CODES: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "USER_DISABLED",
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "USER_NOT_FOUND",
    "CREDENTIAL_TOO_OLD_LOGIN_AGAIN",
];

/// Error codes that mean the requested account cannot be created.
const ACCOUNT_REJECTED_CODES: &[&str] = &[
    "EMAIL_EXISTS",
    "WEAK_PASSWORD",
    "INVALID_EMAIL",
    "MISSING_PASSWORD",
    "MISSING_EMAIL",
];

pub struct FirebaseIdentity {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl FirebaseIdentity {
    /// Create a client. Requires the web API key and the credential file.
    pub fn from_settings(settings: &AuthSettings, retry: RetryPolicy) -> Result<Self> {
        let api_key = settings.api_key()?;
        if let Some(project) = read_project_id(&settings.credentials_path()?)? {
            info!("Using identity project {}", project);
        }
        Self::new(&settings.endpoint, api_key, retry)
    }

    pub fn new(endpoint: &str, api_key: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(retry.timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = format!("{}/accounts:{}", self.endpoint, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &text))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        // Sign-up is not idempotent: one attempt only.
        let once = RetryPolicy::no_retry(self.retry.timeout);
        let tokens: TokenResponse = once.run("identity", || self.call("signUp", &body)).await?;

        info!("Created account {}", tokens.local_id);
        Ok(AuthSession {
            user_id: tokens.local_id,
            email: if tokens.email.is_empty() { email.to_string() } else { tokens.email },
            id_token: tokens.id_token,
        })
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let tokens: TokenResponse = self
            .retry
            .run("identity", || self.call("signInWithPassword", &body))
            .await?;

        Ok(AuthSession {
            user_id: tokens.local_id,
            email: if tokens.email.is_empty() { email.to_string() } else { tokens.email },
            id_token: tokens.id_token,
        })
    }

    #[instrument(skip_all)]
    async fn verify_token(&self, id_token: &str) -> Result<Identity> {
        let body = json!({ "idToken": id_token });
        let lookup: LookupResponse = self
            .retry
            .run("identity", || self.call("lookup", &body))
            .await?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| MultitoolError::AuthInvalid("token does not match any user".to_string()))?;

        Ok(Identity {
            user_id: user.local_id,
            email: user.email,
        })
    }
}

/// Map an identity service error response to an error variant.
///
/// The service answers `{"error": {"message": "CODE : detail"}}`.
fn classify_error(status: u16, body: &str) -> MultitoolError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status));

    let code = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    if ACCOUNT_REJECTED_CODES.contains(&code) {
        MultitoolError::AccountRejected(message)
    } else if AUTH_INVALID_CODES.contains(&code) {
        MultitoolError::AuthInvalid(message)
    } else {
        MultitoolError::upstream("identity", message, status >= 500 || status == 429)
    }
}

/// Read `project_id` from a service account credential file.
fn read_project_id(path: &Path) -> Result<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    let credentials: Value = serde_json::from_str(&content).map_err(|e| {
        MultitoolError::Config(format!(
            "Identity credential file {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })?;
    Ok(credentials["project_id"].as_str().map(str::to_string))
}
