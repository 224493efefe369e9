use secrecy::SecretString;
use strava_client::{
    ActivityQuery, StravaClient, config::Config, http_client::ReqwestStravaClient,
    utils::parse_window_bound,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_env()?;
    let token = std::env::var("STRAVA_ACCESS_TOKEN").map_err(|_| "STRAVA_ACCESS_TOKEN not set")?;
    let client = ReqwestStravaClient::new(&cfg.api_base, SecretString::new(token.into()));

    let bound = |var: &str, default: &str| {
        let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
        parse_window_bound(&raw).ok_or_else(|| format!("{var}: cannot parse '{raw}'"))
    };
    let after = bound("STRAVA_AFTER", "2019-06-01")?;
    let before = bound("STRAVA_BEFORE", "2019-08-17")?;

    let activities = client
        .list_all_athlete_activities(ActivityQuery::new(after.timestamp(), before.timestamp()))
        .await
        .map_err(|e| format!("failed to fetch activities: {}", e))?;

    if activities.is_empty() {
        println!("No activities between {after} and {before}");
        return Ok(());
    }

    println!("Activities between {} and {}:", after.date_naive(), before.date_naive());
    for a in activities {
        let name = a.name.unwrap_or_else(|| "(no name)".to_string());
        println!("- {}: {} ({:.1} km)", a.id, name, a.distance / 1000.0);
    }

    Ok(())
}
