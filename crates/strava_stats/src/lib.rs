//! Strava riding statistics.
//!
//! Obtains an athlete access token (supplied, or through a local browser
//! OAuth hand-off), then aggregates the athlete's activities in a time window
//! into average speed, distance, elevation and climb records.

use std::sync::Arc;

use secrecy::ExposeSecret;
use strava_client::config::Config;
use strava_client::http_client::ReqwestStravaClient;

pub mod authorizer;
pub mod cli;
pub mod domains;
pub mod error;
pub mod report;
pub mod services;
mod test_utils;

use crate::authorizer::Authorizer;
use crate::cli::{Args, TokenSource};
use crate::domains::Summary;
use crate::error::{AppResult, AuthorizationError};
use crate::services::ActivityAggregator;

/// One statistics run: resolve a token, then aggregate the window.
///
/// Credentials and the window are validated before anything touches the
/// network.
pub async fn run(args: &Args, endpoints: &Config) -> AppResult<Summary> {
    let window = args.window()?;
    let token = match args.token_source()? {
        TokenSource::Supplied(token) => token,
        TokenSource::Authorize(app) => {
            Authorizer::new(app, endpoints, args.authorizer_config())?
                .authorize()
                .await?
        }
    };
    if token.expose_secret().is_empty() {
        return Err(AuthorizationError::EmptyToken.into());
    }
    tracing::debug!(api_base = %endpoints.api_base, "access token obtained");

    let client = ReqwestStravaClient::new(&endpoints.api_base, token);
    ActivityAggregator::new(Arc::new(client), args.aggregate_options())
        .aggregate(&window)
        .await
}
