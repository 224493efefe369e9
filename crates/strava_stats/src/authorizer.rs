//! Local OAuth hand-off.
//!
//! Serves a consent link on a loopback listener and waits for Strava to
//! redirect the browser back with an authorization code. The callback handler
//! delivers exactly one outcome through a single-use rendezvous; repeated
//! callbacks are answered with a page but never delivered. The listener is
//! shut down on every exit path.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use secrecy::{ExposeSecret, SecretString};
use strava_client::config::Config;
use strava_client::oauth::{
    AuthorizationResponse, CallbackParams, DEFAULT_SCOPE, OAuthApp, OAuthAuthenticator,
    OAuthError,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::AuthorizationError;

pub const DEFAULT_STATE: &str = "state1";
pub const CALLBACK_PATH: &str = "/exchange_token";

const CONNECT_BUTTON: &str = "http://strava.github.io/api/images/ConnectWithStrava.png";

type Outcome = Result<AuthorizationResponse, AuthorizationError>;

#[derive(Clone, Debug)]
pub struct AuthorizerConfig {
    pub listen: SocketAddr,
    pub callback_url: String,
    pub state: String,
    pub scope: String,
    /// `None` waits until a callback arrives, however long that takes.
    pub timeout: Option<Duration>,
}

impl AuthorizerConfig {
    /// Listen on `listen` and have Strava redirect to `localhost` on the same port.
    pub fn for_listen(listen: SocketAddr) -> Self {
        Self {
            listen,
            callback_url: format!("http://localhost:{}{}", listen.port(), CALLBACK_PATH),
            state: DEFAULT_STATE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self::for_listen(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}

/// Holds the sender until the first callback claims it.
struct Rendezvous {
    slot: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Rendezvous {
    fn new(tx: oneshot::Sender<Outcome>) -> Self {
        Self {
            slot: Mutex::new(Some(tx)),
        }
    }

    /// Take the sender. Only the first caller gets `Some`.
    fn claim(&self) -> Option<oneshot::Sender<Outcome>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns `false` when the sender was already claimed.
    fn deliver(&self, outcome: Outcome) -> bool {
        match self.claim() {
            Some(tx) => {
                send_outcome(tx, outcome);
                true
            }
            None => false,
        }
    }
}

fn send_outcome(tx: oneshot::Sender<Outcome>, outcome: Outcome) {
    // The waiter may already be gone; that is not an error for the handler.
    if tx.send(outcome).is_err() {
        tracing::debug!("oauth outcome dropped; nobody is waiting");
    }
}

struct CallbackState {
    authenticator: Arc<OAuthAuthenticator>,
    rendezvous: Rendezvous,
    consent_url: String,
    expected_state: String,
}

/// Shuts the listener down when closed or dropped.
struct ListenerGuard {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ListenerGuard {
    async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("oauth listener task failed: {e}");
        }
        tracing::debug!("oauth listener stopped");
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct Authorizer {
    authenticator: Arc<OAuthAuthenticator>,
    config: AuthorizerConfig,
}

impl Authorizer {
    pub fn new(
        app: OAuthApp,
        endpoints: &Config,
        config: AuthorizerConfig,
    ) -> Result<Self, AuthorizationError> {
        let authenticator = OAuthAuthenticator::new(app, &config.callback_url, endpoints)?;
        if authenticator.callback_path() == "/" {
            return Err(OAuthError::Url(format!(
                "callback url {} must not use the root path",
                config.callback_url
            ))
            .into());
        }
        Ok(Self {
            authenticator: Arc::new(authenticator),
            config,
        })
    }

    /// Run the whole hand-off: start the listener, tell the operator where to
    /// go, and wait for the outcome.
    pub async fn authorize(&self) -> Result<SecretString, AuthorizationError> {
        let pending = self.start().await?;
        eprintln!(
            "Please visit http://{} to authorize this application to access your account",
            pending.local_addr()
        );
        eprintln!("(or open {} directly)", pending.consent_url());
        let response = pending.wait().await?;
        Ok(response.access_token)
    }

    /// Bind the listener and serve the consent and callback routes.
    pub async fn start(&self) -> Result<PendingAuthorization, AuthorizationError> {
        let consent_url =
            self.authenticator
                .authorization_url(&self.config.state, &self.config.scope, true)?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            authenticator: self.authenticator.clone(),
            rendezvous: Rendezvous::new(outcome_tx),
            consent_url: consent_url.clone(),
            expected_state: self.config.state.clone(),
        });

        let app = Router::new()
            .route("/", get(consent_page))
            .route(self.authenticator.callback_path(), get(exchange_token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(self.config.listen).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            %local_addr,
            client_id = self.authenticator.client_id(),
            callback = self.authenticator.callback_path(),
            "oauth listener started"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("oauth listener exited abnormally: {e}");
                state.rendezvous.deliver(Err(AuthorizationError::Listener(e)));
            }
        });

        Ok(PendingAuthorization {
            local_addr,
            consent_url,
            outcome_rx,
            timeout: self.config.timeout,
            listener: ListenerGuard {
                shutdown: Some(shutdown_tx),
                task: Some(task),
            },
        })
    }
}

/// A running listener waiting for its single callback.
pub struct PendingAuthorization {
    local_addr: SocketAddr,
    consent_url: String,
    outcome_rx: oneshot::Receiver<Outcome>,
    timeout: Option<Duration>,
    listener: ListenerGuard,
}

impl PendingAuthorization {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn consent_url(&self) -> &str {
        &self.consent_url
    }

    /// Wait for the callback outcome, then stop the listener.
    pub async fn wait(self) -> Result<AuthorizationResponse, AuthorizationError> {
        let PendingAuthorization {
            outcome_rx,
            timeout,
            listener,
            ..
        } = self;

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, outcome_rx)
                .await
                .map_err(|_| AuthorizationError::Timeout(limit)),
            None => Ok(outcome_rx.await),
        };
        listener.close().await;

        match received? {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthorizationError::ListenerExited),
        }
    }
}

async fn consent_page(State(state): State<Arc<CallbackState>>) -> Html<String> {
    Html(format!(
        r#"<a href="{}"><img src="{}" /></a>"#,
        escape_html(&state.consent_url),
        CONNECT_BUTTON
    ))
}

async fn exchange_token(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let Some(tx) = state.rendezvous.claim() else {
        tracing::warn!("ignoring repeated oauth callback");
        return Html(page(
            "Authorization already completed",
            "This authorization attempt has already finished. You can close this window.",
        ));
    };

    let outcome = match state
        .authenticator
        .handle_callback(&params, &state.expected_state)
        .await
    {
        Ok(resp) if resp.access_token.expose_secret().is_empty() => {
            Err(AuthorizationError::EmptyToken)
        }
        Ok(resp) => Ok(resp),
        Err(e) => Err(AuthorizationError::OAuth(e)),
    };

    let body = match &outcome {
        Ok(resp) => success_page(resp),
        Err(e) => {
            tracing::warn!("oauth callback failed: {e}");
            failure_page(e)
        }
    };
    send_outcome(tx, outcome);
    Html(body)
}

fn success_page(resp: &AuthorizationResponse) -> String {
    let athlete = resp
        .athlete
        .as_ref()
        .and_then(|a| serde_json::to_string_pretty(a).ok())
        .unwrap_or_else(|| "(no athlete in response)".to_string());
    page(
        "SUCCESS",
        &format!(
            "State: {}\n\nThe Authenticated Athlete (you):\n{}\n\nYou can close this window and return to the terminal.",
            resp.state, athlete
        ),
    )
}

fn failure_page(err: &AuthorizationError) -> String {
    let explanation = match err {
        AuthorizationError::OAuth(OAuthError::Denied) => {
            "The user clicked the 'Do not Authorize' button on the previous page.".to_string()
        }
        AuthorizationError::OAuth(OAuthError::InvalidCredentials) => {
            "You provided an incorrect client_id or client_secret.".to_string()
        }
        AuthorizationError::OAuth(OAuthError::InvalidCode) => {
            "The temporary token was not recognized, this shouldn't happen normally.".to_string()
        }
        AuthorizationError::OAuth(OAuthError::Server) => {
            "There was some sort of server error. Re-run the program to see if the problem continues."
                .to_string()
        }
        other => other.to_string(),
    };
    page("Authorization Failure", &explanation)
}

fn page(title: &str, text: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{0}</title></head>\n<body>\n<h1>{0}</h1>\n<pre>{1}</pre>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(text)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn authenticator() -> Arc<OAuthAuthenticator> {
        let app = OAuthApp {
            client_id: 38247,
            client_secret: SecretString::new("shh".into()),
        };
        let config = Config::from_env_with(|_| None).expect("config");
        Arc::new(
            OAuthAuthenticator::new(app, "http://localhost:8080/exchange_token", &config)
                .expect("authenticator"),
        )
    }

    fn router() -> (Router, oneshot::Receiver<Outcome>) {
        let authenticator = authenticator();
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            consent_url: authenticator
                .authorization_url(DEFAULT_STATE, DEFAULT_SCOPE, true)
                .expect("url"),
            authenticator: authenticator.clone(),
            rendezvous: Rendezvous::new(tx),
            expected_state: DEFAULT_STATE.into(),
        });
        let router = Router::new()
            .route("/", get(consent_page))
            .route(CALLBACK_PATH, get(exchange_token))
            .with_state(state);
        (router, rx)
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[test]
    fn rendezvous_delivers_once() {
        let (tx, mut rx) = oneshot::channel();
        let r = Rendezvous::new(tx);
        assert!(r.deliver(Err(AuthorizationError::EmptyToken)));
        assert!(r.claim().is_none());
        assert!(!r.deliver(Err(AuthorizationError::ListenerExited)));
        assert!(matches!(rx.try_recv(), Ok(Err(AuthorizationError::EmptyToken))));
    }

    #[test]
    fn claimed_rendezvous_refuses_later_deliveries() {
        let (tx, mut rx) = oneshot::channel();
        let r = Rendezvous::new(tx);
        let claimed = r.claim().expect("first claim");
        assert!(r.claim().is_none());
        assert!(!r.deliver(Err(AuthorizationError::ListenerExited)));
        send_outcome(claimed, Err(AuthorizationError::EmptyToken));
        assert!(matches!(rx.try_recv(), Ok(Err(AuthorizationError::EmptyToken))));
    }

    #[test]
    fn poisoned_rendezvous_still_delivers() {
        let (tx, mut rx) = oneshot::channel();
        let r = Arc::new(Rendezvous::new(tx));
        let poisoner = r.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.slot.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(r.slot.is_poisoned());
        assert!(r.deliver(Err(AuthorizationError::EmptyToken)));
        assert!(matches!(rx.try_recv(), Ok(Err(AuthorizationError::EmptyToken))));
    }

    #[test]
    fn rendezvous_tolerates_departed_waiter() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let r = Rendezvous::new(tx);
        assert!(r.deliver(Err(AuthorizationError::EmptyToken)));
    }

    #[test]
    fn default_config_uses_fixed_port_and_state() {
        let cfg = AuthorizerConfig::default();
        assert_eq!(cfg.listen.port(), 8080);
        assert_eq!(cfg.callback_url, "http://localhost:8080/exchange_token");
        assert_eq!(cfg.state, "state1");
        assert!(cfg.timeout.is_none());
    }

    #[test]
    fn root_callback_path_is_rejected() {
        let app = OAuthApp {
            client_id: 1,
            client_secret: SecretString::new("x".into()),
        };
        let endpoints = Config::from_env_with(|_| None).expect("config");
        let mut cfg = AuthorizerConfig::default();
        cfg.callback_url = "http://localhost:8080/".into();
        assert!(matches!(
            Authorizer::new(app, &endpoints, cfg),
            Err(AuthorizationError::OAuth(OAuthError::Url(_)))
        ));
    }

    #[test]
    fn escape_html_escapes_query_separators() {
        assert_eq!(escape_html("a?b=1&c=<2>"), "a?b=1&amp;c=&lt;2&gt;");
    }

    #[tokio::test]
    async fn consent_page_links_to_strava() {
        let (router, _rx) = router();
        let resp = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("https://www.strava.com/oauth/authorize?client_id=38247"));
        assert!(body.contains("state=state1"));
        assert!(body.contains("ConnectWithStrava.png"));
    }

    #[tokio::test]
    async fn denied_callback_renders_failure_and_delivers() {
        let (router, rx) = router();
        let resp = router
            .oneshot(
                Request::get("/exchange_token?state=state1&error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_text(resp).await;
        assert!(body.contains("Authorization Failure"));
        assert!(body.contains("Do not Authorize"));
        assert!(matches!(
            rx.await,
            Ok(Err(AuthorizationError::OAuth(OAuthError::Denied)))
        ));
    }

    #[tokio::test]
    async fn repeated_callback_is_a_no_op() {
        let (router, rx) = router();
        let first = router
            .clone()
            .oneshot(
                Request::get("/exchange_token?state=state1&error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = router
            .oneshot(
                Request::get("/exchange_token?state=state1&error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(second).await.contains("already completed"));
        assert!(matches!(
            rx.await,
            Ok(Err(AuthorizationError::OAuth(OAuthError::Denied)))
        ));
    }
}
