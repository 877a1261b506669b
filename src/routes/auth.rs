use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        auth_dto::{AuthResponse, LoginPayload, RegisterPayload},
        user_dto::UserResponse,
    },
    error::Result,
    routes::extract::Json,
    middleware::auth::CurrentUser,
    services::auth_service::IssuedSession,
    AppState,
};

impl From<IssuedSession> for AuthResponse {
    fn from(value: IssuedSession) -> Self {
        Self {
            token: value.token,
            expires_at: value.expires_at,
            user: UserResponse::from(value.user),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Account created and session issued", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let issued = state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(issued))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let issued = state.auth_service.login(payload).await?;
    Ok(Json(AuthResponse::from(issued)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    state.auth_service.logout(current.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The calling user", body = UserResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn me(Extension(current): Extension<CurrentUser>) -> Result<impl IntoResponse> {
    Ok(Json(UserResponse::from(current.user)))
}
