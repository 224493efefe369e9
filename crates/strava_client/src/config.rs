use crate::StravaError;

pub const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_AUTH_URL: &str = "https://www.strava.com/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Remote endpoints. Credentials and tokens are not part of this; they come
/// from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub auth_url: String,
    pub token_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, StravaError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function. This avoids mutating global environment in tests and keeps
    /// `from_env()` small and safe.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, StravaError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api_base = get("STRAVA_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        let auth_url = get("STRAVA_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.into());
        let token_url = get("STRAVA_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.into());
        for (key, value) in [
            ("STRAVA_API_BASE", &api_base),
            ("STRAVA_AUTH_URL", &auth_url),
            ("STRAVA_TOKEN_URL", &token_url),
        ] {
            reqwest::Url::parse(value)
                .map_err(|e| StravaError::Config(format!("{key} is not a valid url: {e}")))?;
        }
        Ok(Self {
            api_base,
            auth_url,
            token_url,
        })
    }
}
