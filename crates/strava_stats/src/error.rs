//! Error taxonomy for a statistics run. Every variant is terminal.

use std::time::Duration;

use strava_client::StravaError;
use strava_client::oauth::OAuthError;
use thiserror::Error;

/// Failures of the local OAuth hand-off.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("no access token in Strava authorization response")]
    EmptyToken,

    #[error("oauth listener failed: {0}")]
    Listener(#[from] std::io::Error),

    #[error("oauth listener exited before a callback arrived")]
    ListenerExited,

    #[error("no authorization callback within {0:?}")]
    Timeout(Duration),
}

/// Top-level errors for a statistics run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to obtain athlete access token: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Failed to obtain activities list: {0}")]
    ListActivities(#[source] StravaError),

    #[error("Failed to obtain details of activity {activity_id}: {source}")]
    ActivityDetail {
        activity_id: u64,
        #[source]
        source: StravaError,
    },
}

impl AppError {
    /// Fetch failures of either kind.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            AppError::ListActivities(_) | AppError::ActivityDetail { .. }
        )
    }
}

/// Result type alias for statistics runs.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_error_names_activity() {
        let err = AppError::ActivityDetail {
            activity_id: 42,
            source: StravaError::NotFound("Record Not Found".into()),
        };
        assert!(err.is_fetch());
        assert_eq!(
            err.to_string(),
            "Failed to obtain details of activity 42: not found: Record Not Found"
        );
    }

    #[test]
    fn oauth_denial_is_wrapped_as_authorization() {
        let err: AppError = AuthorizationError::from(OAuthError::Denied).into();
        assert!(matches!(
            err,
            AppError::Authorization(AuthorizationError::OAuth(OAuthError::Denied))
        ));
        assert!(err.to_string().contains("declined"));
    }
}
