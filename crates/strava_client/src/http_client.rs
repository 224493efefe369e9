//! HTTP client implementation for the Strava v3 API.
//!
//! This module provides a reqwest-based implementation of the [`StravaClient`](crate::StravaClient) trait.

use crate::{ActivityQuery, ActivitySummary, DetailedActivity, StravaClient, StravaError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Client for the Strava API using reqwest and a bearer access token.
#[derive(Clone, Debug)]
pub struct ReqwestStravaClient {
    base_url: String,
    access_token: SecretString,
    client: reqwest::Client,
}

impl ReqwestStravaClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - The API root (e.g., "https://www.strava.com/api/v3")
    /// * `access_token` - The athlete's OAuth access token
    pub fn new(base_url: &str, access_token: SecretString) -> Self {
        Self::with_http_client(base_url, access_token, reqwest::Client::new())
    }

    pub fn with_http_client(
        base_url: &str,
        access_token: SecretString,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            client,
        }
    }

    /// Build an authenticated GET request.
    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StravaError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        // Read body as text first so a shape mismatch names the offending payload.
        let text = resp.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            let body_snippet: String = text.chars().take(256).collect();
            StravaError::Decode(format!("{e} - body: {body_snippet}"))
        })
    }
}

/// Extract error information from a failed response.
pub(crate) async fn error_from_response(resp: reqwest::Response) -> StravaError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let body_snippet: String = body.chars().take(256).collect();

    match status {
        404 => StravaError::NotFound(body_snippet),
        401 | 403 => StravaError::Auth(body_snippet),
        _ => StravaError::from_status(status, body_snippet),
    }
}

#[async_trait]
impl StravaClient for ReqwestStravaClient {
    async fn list_athlete_activities(
        &self,
        query: ActivityQuery,
    ) -> Result<Vec<ActivitySummary>, StravaError> {
        let url = format!("{}/athlete/activities", self.base_url);
        let pairs: Vec<(&str, String)> = vec![
            ("after", query.after.to_string()),
            ("before", query.before.to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
        ];
        self.execute_json(self.get_request(&url).query(&pairs)).await
    }

    async fn get_activity(
        &self,
        activity_id: u64,
        include_all_efforts: bool,
    ) -> Result<DetailedActivity, StravaError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        let qp = [(
            "include_all_efforts",
            if include_all_efforts { "true" } else { "false" },
        )];
        self.execute_json(self.get_request(&url).query(&qp)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_new_trims_trailing_slash() {
        let client =
            ReqwestStravaClient::new("http://localhost/api/v3/", SecretString::new("tok".into()));
        assert_eq!(client.base_url, "http://localhost/api/v3");
    }
}
