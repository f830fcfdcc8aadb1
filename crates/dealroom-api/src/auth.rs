//! # Authentication Middleware
//!
//! Bearer tokens carry the caller's role and user id next to the shared
//! secret:
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}    role is "party" or "operator"
//! ```
//!
//! `party` tokens must name a user id; deal access is then decided per deal
//! by whether that user is linked to one of its parties. `operator` tokens
//! may leave the user id empty and can read every deal and the audit chain.
//!
//! With no `AUTH_TOKEN` configured, authentication is disabled: every
//! request is an operator, and an `x-user-id` header (if present) supplies
//! the user id so the negotiation endpoints remain usable in development.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dealroom_core::UserId;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Header carrying the user id when authentication is disabled.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller roles, ordered by privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Negotiates on deals it is linked to.
    Party,
    /// Reads every deal and the audit chain.
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Party => "party",
            Self::Operator => "operator",
        }
    }
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    pub user_id: Option<UserId>,
}

impl CallerIdentity {
    pub fn is_operator(&self) -> bool {
        self.role >= Role::Operator
    }

    /// The caller's user id, required by every negotiation action.
    pub fn require_user(&self) -> Result<UserId, AppError> {
        self.user_id
            .ok_or_else(|| AppError::Unauthorized("request carries no user identity".into()))
    }
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Require operator privileges.
pub fn require_operator(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.is_operator() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            Role::Operator.as_str(),
            caller.role.as_str()
        )))
    }
}

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn parse_user_id(raw: &str) -> Result<UserId, String> {
    raw.parse::<Uuid>()
        .map(UserId::from_uuid)
        .map_err(|e| format!("invalid user_id: {e}"))
}

/// Parse a bearer token of the form `{role}:{user_id}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let [role_str, user_str, secret] = parts.as_slice() else {
        return Err("invalid token format, expected {role}:{user_id}:{secret}".into());
    };
    if !constant_time_token_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }
    let role = match *role_str {
        "party" => Role::Party,
        "operator" => Role::Operator,
        other => return Err(format!("unknown role: {other}")),
    };
    let user_id = if user_str.is_empty() {
        None
    } else {
        Some(parse_user_id(user_str)?)
    };
    if role == Role::Party && user_id.is_none() {
        return Err("party tokens must carry a user_id".into());
    }
    Ok(CallerIdentity { role, user_id })
}

/// Validate the bearer token and inject the [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        let user_id = match request.headers().get(USER_ID_HEADER) {
            Some(value) => match value.to_str().map_err(|e| e.to_string()).and_then(parse_user_id) {
                Ok(id) => Some(id),
                Err(msg) => return unauthorized_response(&msg),
            },
            None => None,
        };
        request.extensions_mut().insert(CallerIdentity {
            role: Role::Operator,
            user_id,
        });
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match parse_bearer_token(provided, &expected) {
                Ok(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
