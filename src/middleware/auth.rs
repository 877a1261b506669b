use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::error::Error;
use crate::models::user::{Role, User};
use crate::AppState;

/// The authenticated caller, resolved from the bearer session token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: Uuid,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response();
    };

    match state.auth_service.authenticate(token.trim()).await {
        Ok((session, user)) => {
            req.extensions_mut().insert(CurrentUser {
                user,
                session_id: session.id,
            });
            next.run(req).await
        }
        Err(Error::Unauthorized(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            e.into_response()
        }
    }
}

/// Route-level gate; runs after `require_session` has attached the caller.
pub async fn require_admin(req: Request, next: Next) -> Response {
    require_role(req, next, &[Role::Admin]).await
}

pub async fn require_staff(req: Request, next: Next) -> Response {
    require_role(req, next, &[Role::Admin, Role::Support]).await
}

async fn require_role(req: Request, next: Next, allowed: &[Role]) -> Response {
    let Some(current) = req.extensions().get::<CurrentUser>() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response();
    };
    if !allowed.contains(&current.user.role) {
        return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
    }
    next.run(req).await
}
