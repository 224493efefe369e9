use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use secrecy::SecretString;
use strava_client::oauth::OAuthApp;
use strava_client::utils::parse_window_bound;

use crate::authorizer::AuthorizerConfig;
use crate::domains::MaxGradePolicy;
use crate::error::{AppError, AppResult};
use crate::services::{AggregateOptions, TimeWindow};

pub const DEFAULT_CLIENT_ID: u64 = 38247;

pub const MISSING_CREDENTIALS: &str =
    "Must provide either athlete access token or app client ID and app client secret";

/// Average speed, distance, elevation and climb records for a Strava athlete.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Athlete access token; skips the browser authorization when set
    #[arg(long, env = "STRAVA_ACCESS_TOKEN", hide_env_values = true, default_value = "")]
    pub token: String,

    /// Application client ID
    #[arg(long, env = "STRAVA_CLIENT_ID", default_value_t = DEFAULT_CLIENT_ID)]
    pub client_id: u64,

    /// Application client secret
    #[arg(long, env = "STRAVA_CLIENT_SECRET", hide_env_values = true, default_value = "")]
    pub client_secret: String,

    /// Start of the activity window (YYYY-MM-DD or RFC 3339, UTC)
    #[arg(long, default_value = "2019-06-01", value_parser = parse_bound)]
    pub after: DateTime<Utc>,

    /// End of the activity window (YYYY-MM-DD or RFC 3339, UTC)
    #[arg(long, default_value = "2019-08-17", value_parser = parse_bound)]
    pub before: DateTime<Utc>,

    /// Address of the local OAuth callback listener
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Give up waiting for the browser callback after this many seconds
    #[arg(long)]
    pub auth_timeout_secs: Option<u64>,

    /// Only read the first page of activities
    #[arg(long, action)]
    pub single_page: bool,

    /// Skip per-activity detail fetches (no climb statistics)
    #[arg(long, action)]
    pub no_segments: bool,

    /// What a segment's maximum grade is compared against for the toughest-maximum-grade record
    #[arg(long, value_enum, default_value_t = MaxGradePolicy::Consistent)]
    pub max_grade_policy: MaxGradePolicy,

    /// Print the summary as pretty JSON instead of the text report
    #[arg(long, action)]
    pub json: bool,
}

fn parse_bound(s: &str) -> Result<DateTime<Utc>, String> {
    parse_window_bound(s).ok_or_else(|| format!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}

/// Where the access token comes from.
#[derive(Debug)]
pub enum TokenSource {
    Supplied(SecretString),
    Authorize(OAuthApp),
}

impl Args {
    /// Decide how to obtain a token without touching the network.
    pub fn token_source(&self) -> AppResult<TokenSource> {
        if !self.token.is_empty() {
            return Ok(TokenSource::Supplied(SecretString::new(
                self.token.clone().into(),
            )));
        }
        if self.client_id == 0 || self.client_secret.is_empty() {
            return Err(AppError::Configuration(MISSING_CREDENTIALS.to_string()));
        }
        Ok(TokenSource::Authorize(OAuthApp {
            client_id: self.client_id,
            client_secret: SecretString::new(self.client_secret.clone().into()),
        }))
    }

    pub fn window(&self) -> AppResult<TimeWindow> {
        TimeWindow::new(self.after, self.before)
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            paginate: !self.single_page,
            include_segments: !self.no_segments,
            max_grade_policy: self.max_grade_policy,
            ..AggregateOptions::default()
        }
    }

    pub fn authorizer_config(&self) -> AuthorizerConfig {
        AuthorizerConfig::for_listen(self.listen)
            .with_timeout(self.auth_timeout_secs.map(Duration::from_secs))
    }
}
