use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::{
    borrow::Cow,
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

pub const FAKE_ACCESS_TOKEN: &str = "fake access token";

/// An in-process stand-in for the hosted backend's authentication API.
///
/// Requests are rejected with 401 unless they carry the configured anon key in the `apikey`
/// header. Users are registered either up front with [`FakeBackend::with_user`] or through the
/// sign-up endpoint.
#[derive(Clone)]
pub struct FakeBackend {
    required_anon_key: Cow<'static, str>,
    users: Arc<Mutex<HashMap<String, String>>>,
    signed_out_tokens: Arc<Mutex<Vec<String>>>,
    failing_logout: bool,
}

#[derive(Deserialize)]
struct CredentialsPayload {
    email: String,
    password: String,
}

impl FakeBackend {
    pub fn new(required_anon_key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            required_anon_key: required_anon_key.into(),
            users: Default::default(),
            signed_out_tokens: Default::default(),
            failing_logout: false,
        }
    }

    /// Makes the logout endpoint answer 500 without revoking anything.
    pub fn with_failing_logout(mut self) -> Self {
        self.failing_logout = true;
        self
    }

    pub fn with_user(self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.users
            .lock()
            .unwrap()
            .insert(email.into(), password.into());
        self
    }

    /// Binds an ephemeral port, serves in the background and returns the base URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/auth/v1/signup", post(sign_up))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        info!("Fake backend listening on {address}");
        format!("http://{address}")
    }

    /// Access tokens for which the logout endpoint was called, in order.
    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.signed_out_tokens.lock().unwrap().clone()
    }

    fn authorised(&self, headers: &HeaderMap) -> bool {
        headers
            .get("apikey")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == self.required_anon_key)
    }
}

async fn sign_up(
    State(state): State<FakeBackend>,
    headers: HeaderMap,
    Json(payload): Json<CredentialsPayload>,
) -> Response {
    if !state.authorised(&headers) {
        return invalid_api_key();
    }
    let mut users = state.users.lock().unwrap();
    if users.contains_key(&payload.email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "User already registered" })),
        )
            .into_response();
    }
    users.insert(payload.email.clone(), payload.password);
    (StatusCode::OK, Json(session_json(&payload.email))).into_response()
}

async fn token(
    State(state): State<FakeBackend>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(payload): Json<CredentialsPayload>,
) -> Response {
    if !state.authorised(&headers) {
        return invalid_api_key();
    }
    if query.get("grant_type").map(String::as_str) != Some("password") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "unsupported_grant_type",
                "error_description": "Unsupported grant type"
            })),
        )
            .into_response();
    }
    let users = state.users.lock().unwrap();
    if users.get(&payload.email) != Some(&payload.password) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response();
    }
    (StatusCode::OK, Json(session_json(&payload.email))).into_response()
}

async fn logout(State(state): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !state.authorised(&headers) {
        return invalid_api_key();
    }
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if state.failing_logout {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Database unavailable" })),
        )
            .into_response();
    }
    state
        .signed_out_tokens
        .lock()
        .unwrap()
        .push(token.to_string());
    StatusCode::NO_CONTENT.into_response()
}

fn invalid_api_key() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid API key" })),
    )
        .into_response()
}

fn session_json(email: &str) -> serde_json::Value {
    json!({
        "access_token": FAKE_ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "fake refresh token",
        "user": {
            "id": format!("user-{email}"),
            "email": email,
        }
    })
}
