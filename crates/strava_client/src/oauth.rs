//! OAuth capability for Strava: consent URL construction, callback parsing and
//! authorization-code exchange.
//!
//! The application credentials live inside an [`OAuthAuthenticator`] value
//! rather than in process-wide state, so each authorization attempt owns its
//! own configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

/// Read-only access including private activities.
pub const DEFAULT_SCOPE: &str = "read,activity:read_all";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("the athlete declined to authorize this application")]
    Denied,
    #[error("invalid application client id or client secret")]
    InvalidCredentials,
    #[error("the authorization code was not recognized")]
    InvalidCode,
    #[error("remote server error during token exchange; re-run the program to try again")]
    Server,
    #[error("callback state {0:?} does not match the requested state")]
    StateMismatch(Option<String>),
    #[error("invalid oauth url: {0}")]
    Url(String),
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Registered application credentials.
#[derive(Clone, Debug)]
pub struct OAuthApp {
    pub client_id: u64,
    pub client_secret: SecretString,
}

/// Query parameters Strava appends when redirecting back to the callback.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Clone, Debug)]
pub struct AuthorizationResponse {
    pub state: String,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<i64>,
    pub athlete: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct TokenPayload {
    #[serde(default)]
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    athlete: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct FaultPayload {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<FaultDetail>,
}

#[derive(Deserialize)]
struct FaultDetail {
    #[serde(default)]
    resource: String,
}

#[derive(Clone, Debug)]
pub struct OAuthAuthenticator {
    app: OAuthApp,
    callback_url: reqwest::Url,
    authorize_url: String,
    token_url: String,
    http: reqwest::Client,
}

impl OAuthAuthenticator {
    pub fn new(app: OAuthApp, callback_url: &str, config: &Config) -> Result<Self, OAuthError> {
        let callback_url = reqwest::Url::parse(callback_url)
            .map_err(|e| OAuthError::Url(format!("{callback_url}: {e}")))?;
        Ok(Self {
            app,
            callback_url,
            authorize_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http: reqwest::Client::new(),
        })
    }

    pub fn client_id(&self) -> u64 {
        self.app.client_id
    }

    /// Path component of the callback URL; the local listener mounts its
    /// redirect handler here.
    pub fn callback_path(&self) -> &str {
        self.callback_url.path()
    }

    /// Consent page URL the athlete must visit.
    pub fn authorization_url(
        &self,
        state: &str,
        scope: &str,
        force_prompt: bool,
    ) -> Result<String, OAuthError> {
        let mut url = reqwest::Url::parse(&self.authorize_url)
            .map_err(|e| OAuthError::Url(format!("{}: {e}", self.authorize_url)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.app.client_id.to_string())
            .append_pair("redirect_uri", self.callback_url.as_str())
            .append_pair("response_type", "code")
            .append_pair(
                "approval_prompt",
                if force_prompt { "force" } else { "auto" },
            )
            .append_pair("scope", scope)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Interpret the provider redirect and, when it carries a code, exchange it.
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
        expected_state: &str,
    ) -> Result<AuthorizationResponse, OAuthError> {
        if let Some(error) = params.error.as_deref() {
            if error == "access_denied" {
                return Err(OAuthError::Denied);
            }
            return Err(OAuthError::Exchange(format!("provider returned error {error}")));
        }
        if params.state.as_deref() != Some(expected_state) {
            return Err(OAuthError::StateMismatch(params.state.clone()));
        }
        let code = match params.code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => return Err(OAuthError::InvalidCode),
        };

        let payload = self.exchange_code(code).await?;
        Ok(AuthorizationResponse {
            state: expected_state.to_string(),
            access_token: SecretString::new(payload.access_token.into()),
            refresh_token: payload.refresh_token.map(|t| SecretString::new(t.into())),
            expires_at: payload.expires_at,
            athlete: payload.athlete,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPayload, OAuthError> {
        let client_id = self.app.client_id.to_string();
        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", self.app.client_secret.expose_secret()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];

        tracing::debug!(token_url = %self.token_url, "exchanging authorization code");
        let resp = self.http.post(&self.token_url).form(&params).send().await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(OAuthError::Server);
        }
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(classify_fault(&text));
        }
        serde_json::from_str::<TokenPayload>(&text)
            .map_err(|e| OAuthError::Exchange(format!("decoding token response: {e}")))
    }
}

/// Map a 4xx token-endpoint body onto the failure classes the caller reports.
fn classify_fault(body: &str) -> OAuthError {
    let Ok(fault) = serde_json::from_str::<FaultPayload>(body) else {
        return OAuthError::Server;
    };
    match fault.errors.first().map(|d| d.resource.as_str()) {
        None => OAuthError::Server,
        Some("Application") => OAuthError::InvalidCredentials,
        Some("RequestToken") => OAuthError::InvalidCode,
        Some(_) => OAuthError::Exchange(fault.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> OAuthAuthenticator {
        let app = OAuthApp {
            client_id: 38247,
            client_secret: SecretString::new("shh".into()),
        };
        let config = Config::from_env_with(|_| None).expect("default config");
        OAuthAuthenticator::new(app, "http://localhost:8080/exchange_token", &config)
            .expect("authenticator")
    }

    #[test]
    fn callback_path_comes_from_callback_url() {
        assert_eq!(authenticator().callback_path(), "/exchange_token");
    }

    #[test]
    fn authorization_url_carries_scope_state_and_redirect() {
        let url = authenticator()
            .authorization_url("state1", DEFAULT_SCOPE, true)
            .expect("url");
        let parsed = reqwest::Url::parse(&url).expect("parse");
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "38247");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/exchange_token");
        assert_eq!(pairs["scope"], DEFAULT_SCOPE);
        assert_eq!(pairs["state"], "state1");
        assert_eq!(pairs["approval_prompt"], "force");
        assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
    }

    #[test]
    fn rejects_unparseable_callback_url() {
        let app = OAuthApp {
            client_id: 1,
            client_secret: SecretString::new("x".into()),
        };
        let config = Config::from_env_with(|_| None).expect("default config");
        let res = OAuthAuthenticator::new(app, "not a url", &config);
        assert!(matches!(res, Err(OAuthError::Url(_))));
    }

    #[test]
    fn classify_fault_by_resource() {
        let app_err = r#"{"message":"Bad Request","errors":[{"resource":"Application","field":"client_id","code":"invalid"}]}"#;
        assert!(matches!(classify_fault(app_err), OAuthError::InvalidCredentials));
        let code_err = r#"{"message":"Bad Request","errors":[{"resource":"RequestToken","field":"code","code":"invalid"}]}"#;
        assert!(matches!(classify_fault(code_err), OAuthError::InvalidCode));
        assert!(matches!(classify_fault(r#"{"message":"x","errors":[]}"#), OAuthError::Server));
        assert!(matches!(classify_fault("<html>"), OAuthError::Server));
    }

    #[tokio::test]
    async fn denied_callback_short_circuits() {
        let params = CallbackParams {
            error: Some("access_denied".into()),
            state: Some("state1".into()),
            ..Default::default()
        };
        let res = authenticator().handle_callback(&params, "state1").await;
        assert!(matches!(res, Err(OAuthError::Denied)));
    }

    #[tokio::test]
    async fn missing_code_is_invalid_code() {
        let params = CallbackParams {
            state: Some("state1".into()),
            ..Default::default()
        };
        let res = authenticator().handle_callback(&params, "state1").await;
        assert!(matches!(res, Err(OAuthError::InvalidCode)));
    }

    #[tokio::test]
    async fn wrong_state_is_rejected_before_exchange() {
        let params = CallbackParams {
            code: Some("abc".into()),
            state: Some("other".into()),
            ..Default::default()
        };
        let res = authenticator().handle_callback(&params, "state1").await;
        assert!(matches!(res, Err(OAuthError::StateMismatch(Some(s))) if s == "other"));
    }
}
