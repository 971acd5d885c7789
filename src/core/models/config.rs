//! Application config model

use serde::{Deserialize, Serialize};

/// Identity provider settings for the implicit-grant login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub idp_host: String,
    pub login_path: String,
    pub logout_path: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: "5khm2intordkd1jjr7rbborbfj".to_string(),
            redirect_uri: "https://www.23andme.com/".to_string(),
            idp_host: "insta23prod.auth.us-west-2.amazoncognito.com".to_string(),
            login_path: "/login".to_string(),
            logout_path: "/logout".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub photos_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            photos_url:
                "https://kqlpe1bymk.execute-api.us-west-2.amazonaws.com/Prod/users/self/media/recent"
                    .to_string(),
        }
    }
}

/// What a gallery does when the photo list cannot be loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// Keep showing whatever was loaded before
    #[default]
    Ignore,
    /// Treat the failure as an expired session and log out
    Logout,
}

/// Application config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub oauth: OAuthConfig,
    pub api: ApiConfig,
    pub image_cache_capacity: usize,
    pub load_failure_policy: LoadFailurePolicy,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            oauth: OAuthConfig::default(),
            api: ApiConfig::default(),
            image_cache_capacity: 100,
            load_failure_policy: LoadFailurePolicy::Ignore,
        }
    }

    /// Environment variables win over the config file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PHOTOS_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Ok(v) = std::env::var("PHOTOS_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("PHOTOS_IDP_HOST") {
            self.oauth.idp_host = v;
        }
        if let Ok(v) = std::env::var("PHOTOS_API_URL") {
            self.api.photos_url = v;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
