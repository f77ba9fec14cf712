//! HTTP API: sign-up, login, authenticated chat, conversation reset and health.

use crate::agent::{Agent, SessionStore};
use crate::auth::{bearer_token, Identity, IdentityProvider};
use crate::error::MultitoolError;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state.
pub struct AppState {
    /// The agent, or why it could not be created.
    agent: std::result::Result<Arc<Agent>, String>,
    identity: Arc<dyn IdentityProvider>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(agent: std::result::Result<Arc<Agent>, String>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            agent,
            identity,
            sessions: SessionStore::new(),
        }
    }

    /// Keep at most `capacity` conversations in memory.
    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.sessions = SessionStore::with_capacity(capacity);
        self
    }

    pub fn agent_loaded(&self) -> bool {
        self.agent.is_ok()
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent_loaded: bool,
}

fn auth_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(AuthResponse {
            status: "error".to_string(),
            message: message.into(),
            id_token: None,
        }),
    )
        .into_response()
}

fn chat_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ChatResponse {
            response: message.into(),
            status: "error".to_string(),
        }),
    )
        .into_response()
}

/// Status code for an identity service failure.
fn identity_status(error: &MultitoolError) -> StatusCode {
    match error {
        MultitoolError::AccountRejected(_) => StatusCode::BAD_REQUEST,
        MultitoolError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_GATEWAY,
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        agent_loaded: state.agent_loaded(),
    })
}

async fn signup(State(state): State<Arc<AppState>>, Json(req): Json<Credentials>) -> Response {
    match state.identity.sign_up(req.email.trim(), &req.password).await {
        Ok(session) => {
            info!("Signed up {}", session.user_id);
            Json(AuthResponse {
                status: "success".to_string(),
                message: "Account created successfully".to_string(),
                id_token: Some(session.id_token),
            })
            .into_response()
        }
        Err(e) => {
            warn!("Sign-up failed: {}", e);
            auth_error(identity_status(&e), e.to_string())
        }
    }
}

async fn login(State(state): State<Arc<AppState>>, Json(req): Json<Credentials>) -> Response {
    match state.identity.sign_in(req.email.trim(), &req.password).await {
        Ok(session) => Json(AuthResponse {
            status: "success".to_string(),
            message: "Login successful".to_string(),
            id_token: Some(session.id_token),
        })
        .into_response(),
        Err(e) => {
            warn!("Login failed: {}", e);
            auth_error(identity_status(&e), e.to_string())
        }
    }
}

/// Resolve the caller from the `Authorization` header.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> std::result::Result<Identity, Response> {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
    else {
        return Err(chat_error(StatusCode::UNAUTHORIZED, "Missing or malformed bearer token"));
    };

    state.identity.verify_token(token).await.map_err(|e| {
        warn!("Token rejected: {}", e);
        let status = match e {
            MultitoolError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_GATEWAY,
        };
        chat_error(status, e.to_string())
    })
}

/// The body is parsed only after the caller is authenticated.
async fn chat(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let identity = match authenticate(&state, &headers).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => return chat_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)),
    };

    let agent = match &state.agent {
        Ok(agent) => agent.clone(),
        Err(reason) => {
            return chat_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Agent is not initialized: {}", reason),
            )
        }
    };

    let session = state.sessions.get_or_create(&identity.user_id).await;
    let mut session = session.lock().await;

    match agent.run(&mut session, &req.message).await {
        Ok(response) => Json(ChatResponse {
            response: response.content,
            status: "success".to_string(),
        })
        .into_response(),
        Err(e) => {
            error!("Agent failed for {}: {}", identity.user_id, e);
            chat_error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Clear the caller's conversation. The task list is kept.
async fn reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let identity = match authenticate(&state, &headers).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let message = if state.sessions.reset(&identity.user_id).await {
        info!("Reset conversation for {}", identity.user_id);
        "Conversation cleared"
    } else {
        "No conversation to clear"
    };
    Json(ResetResponse {
        status: "success".to_string(),
        message: message.to_string(),
    })
    .into_response()
}
