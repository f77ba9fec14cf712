//! HTTP API server command.

use crate::auth::{FirebaseIdentity, IdentityProvider};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::retry::RetryPolicy;
use crate::server::{router, AppState};
use std::sync::Arc;
use tracing::{error, warn};

/// Run the HTTP API server.
///
/// The identity provider is required. If the agent cannot be built the
/// server still starts and `/chat` reports the failure.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let max_sessions = settings.server.max_sessions;

    let identity: Arc<dyn IdentityProvider> = Arc::new(FirebaseIdentity::from_settings(
        &settings.auth,
        RetryPolicy::from_settings(&settings.network),
    )?);

    let agent = match Orchestrator::new(settings) {
        Ok(orchestrator) => {
            if let Err(e) = orchestrator.restore_index().await {
                warn!("Could not restore the saved index: {}", e);
            }
            orchestrator.build_agent().map(Arc::new)
        }
        Err(e) => Err(e),
    }
    .map_err(|e| {
        error!("Agent initialization failed: {}", e);
        e.to_string()
    });

    let state = Arc::new(AppState::new(agent, identity).with_session_capacity(max_sessions));
    let agent_loaded = state.agent_loaded();
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("multitool API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    if !agent_loaded {
        Output::warning("Agent failed to initialize; /chat will return errors.");
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Sign up", "POST /signup");
    Output::kv("Login", "POST /login");
    Output::kv("Chat", "POST /chat  (Authorization: Bearer <id_token>)");
    Output::kv("Reset", "POST /reset (Authorization: Bearer <id_token>)");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
