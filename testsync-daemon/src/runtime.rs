use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use testsync_core::{ConfigError, Secret, Settings};
use testsync_renderer::Renderer;
use testsync_sync::{EventOutcome, Orchestrator, TestAuthor};

use crate::api::{generate_tests, require_api_key};
use crate::error::{io_err, DaemonError, WebhookError};
use crate::github::GithubClient;
use crate::openai::OpenAiAuthor;
use crate::payload::{parse_event, Inbound};
use crate::protocol::{HealthResponse, WebhookResponse};
use crate::signature::SignatureVerifier;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";

/// Shared by every request.
pub struct AppState {
    orchestrator: Orchestrator,
    author: Arc<dyn TestAuthor>,
    verifier: SignatureVerifier,
}

impl AppState {
    /// `author` serves the direct generation API; it is normally the same
    /// collaborator the orchestrator was built with.
    pub fn new(
        orchestrator: Orchestrator,
        author: Arc<dyn TestAuthor>,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            orchestrator,
            author,
            verifier,
        }
    }

    pub(crate) fn author(&self) -> &dyn TestAuthor {
        self.author.as_ref()
    }

    pub(crate) fn api_key(&self) -> Option<&Secret> {
        self.orchestrator.settings().api_key.as_ref()
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        self.orchestrator.settings().call_timeout()
    }

    /// GitHub + OpenAI collaborators built from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self, DaemonError> {
        settings.require_credentials()?;
        let token = settings
            .github_token
            .clone()
            .ok_or(ConfigError::Missing { key: "GITHUB_TOKEN" })?;
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or(ConfigError::Missing { key: "OPENAI_API_KEY" })?;

        let renderer = Arc::new(Renderer::new(settings.prompt_template_dir.as_deref())?);
        let hosting = GithubClient::new(&settings.github_api_base, &token, settings.call_timeout())?;
        let author = OpenAiAuthor::new(
            &settings.openai_base_url,
            &api_key,
            settings.openai_model.clone(),
            renderer,
            settings.call_timeout(),
        )?;
        let author: Arc<dyn TestAuthor> = Arc::new(author);
        let verifier = SignatureVerifier::new(settings.webhook_secret.clone());
        let orchestrator = Orchestrator::new(Arc::new(hosting), author.clone(), settings);
        Ok(Self::new(orchestrator, author, verifier))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/generate-tests", post(generate_tests))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/github-webhook", post(webhook))
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Endpoint not found" })))
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let signature = header(&headers, SIGNATURE_HEADER);
    if !state.verifier.verify(&body, signature) {
        warn!("rejected webhook with invalid signature");
        return Err(WebhookError::InvalidSignature);
    }

    let event = match parse_event(header(&headers, EVENT_HEADER), &body, signature) {
        Ok(Inbound::Event(event)) => event,
        Ok(Inbound::Ignored(message)) => {
            debug!(event = ?header(&headers, EVENT_HEADER), reason = message, "webhook ignored");
            return Ok(Json(WebhookResponse::message(message)));
        }
        Err(e) => {
            warn!(error = %e, "unparseable webhook payload");
            return Err(e);
        }
    };

    info!(repo = %event.repo, kind = %event.kind, branch = %event.branch, "webhook received");
    match state.orchestrator.process_event(&event).await {
        Ok(EventOutcome::Ignored(reason)) => Ok(Json(WebhookResponse::message(reason.to_string()))),
        Ok(EventOutcome::Processed(batch)) => Ok(Json(WebhookResponse::processed(&batch))),
        Err(e) => {
            error!(error = %e, repo = %event.repo, "event processing failed");
            Err(WebhookError::Internal(e.to_string()))
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Bind, serve until ctrl-c, then drain in-flight requests.
pub async fn serve(settings: Settings) -> Result<(), DaemonError> {
    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .map_err(|e: std::net::AddrParseError| DaemonError::BindAddr {
            addr: settings.bind_addr.clone(),
            reason: e.to_string(),
        })?;
    if settings.permissive_signatures() {
        warn!("GITHUB_WEBHOOK_SECRET is not set; webhook signatures will not be verified");
    }
    if settings.dry_run {
        info!("dry run: no test files will be written");
    }
    info!(
        strategy = %settings.strategy,
        framework = %settings.framework,
        branches = %settings.allowed_branches,
        "starting webhook server"
    );

    let state = Arc::new(AppState::from_settings(settings)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| io_err(format!("bind {addr}"), e))?;
    info!(addr = %addr, "webhook server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| io_err("webhook server", e))?;
    info!("webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c, shutting down"),
        Err(err) => error!(error = %err, "ctrl-c handler failed; shutting down"),
    }
}

/// Start the service and block the current thread until it exits.
pub fn start_blocking(settings: Settings, json_logs: bool) -> Result<(), DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(serve(settings))
}

pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_settings_requires_credentials() {
        let err = AppState::from_settings(Settings::default())
            .err()
            .expect("missing credentials");
        assert!(matches!(
            err,
            DaemonError::Config(ConfigError::Missing { key: "GITHUB_TOKEN" })
        ));
    }

    #[tokio::test]
    async fn serve_rejects_bad_bind_address() {
        let settings = Settings {
            bind_addr: "not-an-address".into(),
            ..Settings::default()
        };
        let err = serve(settings).await.expect_err("bad address");
        assert!(matches!(err, DaemonError::BindAddr { .. }));
    }
}
