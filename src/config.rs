//! Application configuration and well-known storage keys.
//!
//! [`AppConfig`] carries the dashboard's identity and API settings. All
//! fields have defaults via [`AppConfig::default()`];
//! [`AppConfig::from_env`] overrides the URLs from the environment.

use std::time::Duration;

/// Environment variable overriding [`AppConfig::url`].
pub const APP_URL_ENV: &str = "DASHBOARD_APP_URL";

/// Environment variable overriding [`ApiConfig::base_url`].
pub const API_URL_ENV: &str = "DASHBOARD_API_URL";

/// Top-level application configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dashboard_stores::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.name, "Dashboard Boilerplate");
/// assert_eq!(config.api.base_url, "/api");
/// assert_eq!(config.api.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Display name of the application.
    pub name: String,
    pub version: String,
    pub description: String,
    /// Public URL the application is served from.
    ///
    /// Default: `http://localhost:3000`.
    pub url: String,
    pub api: ApiConfig,
}

/// API client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL prepended to every API path.
    ///
    /// Default: `/api`.
    pub base_url: String,
    /// Request timeout.
    ///
    /// Default: 10 seconds.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "/api".to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Dashboard Boilerplate".to_owned(),
            version: "1.0.0".to_owned(),
            description: "A scalable dashboard boilerplate".to_owned(),
            url: "http://localhost:3000".to_owned(),
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by [`APP_URL_ENV`] and [`API_URL_ENV`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Empty values are
    /// ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(url) = non_empty(APP_URL_ENV) {
            config.url = url;
        }
        if let Some(base_url) = non_empty(API_URL_ENV) {
            config.api.base_url = base_url;
        }
        config
    }

    /// Join an API path onto [`ApiConfig::base_url`].
    ///
    /// ```
    /// use dashboard_stores::AppConfig;
    ///
    /// let config = AppConfig::default();
    /// assert_eq!(config.api_url("/dashboard/metrics"), "/api/dashboard/metrics");
    /// ```
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Keys used in the key-value storage.
pub mod storage_keys {
    /// Dashboard store blob.
    pub const DASHBOARD_STORE: &str = "dashboard-store";
    /// User store blob.
    pub const USER_STORE: &str = "user-store";
    /// Standalone theme preference.
    pub const THEME: &str = "dashboard-theme";
    /// Standalone sidebar state.
    pub const SIDEBAR_STATE: &str = "dashboard-sidebar";
    /// Per-user display preferences.
    pub const USER_PREFERENCES: &str = "user-preferences";
    /// Bearer token for API calls.
    pub const AUTH_TOKEN: &str = "auth_token";
}
