//! Signed-in account

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Holds the bearer token captured from the login redirect.
///
/// Accounts are never mutated; a new one replaces the old on every login.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    token: String,
    created_at: i64,
}

impl Account {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Short prefix safe to put in logs
    pub fn token_preview(&self) -> String {
        let prefix: String = self.token.chars().take(12).collect();
        format!("{}...", prefix)
    }

    /// Headers every API call made on behalf of this account carries
    pub fn headers(&self) -> AppResult<HeaderMap> {
        let mut value = HeaderValue::from_str(&self.token)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// HTTP client preconfigured with this account's headers
    pub fn http_client(&self) -> AppResult<reqwest::Client> {
        let client = reqwest::Client::builder()
            .default_headers(self.headers()?)
            .build()?;
        Ok(client)
    }

    /// Claims carried by the token when it is a JWT. Not verified.
    pub fn claims(&self) -> Option<IdTokenClaims> {
        IdTokenClaims::peek(&self.token)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Account {}

/// Subset of an OpenID `id_token` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "cognito:username")]
    pub username: Option<String>,
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Decode the payload segment of `token` without checking the signature
    pub fn peek(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Best label for the signed-in user
    pub fn display_name(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.email.as_deref())
            .or(self.sub.as_deref())
    }
}
