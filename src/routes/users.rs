use axum::{
    extract::State,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::user_dto::{UpdateProfilePayload, UpdateRolePayload, UserListQuery, UserResponse},
    error::{Error, Result},
    routes::extract::{Json, Path, Query},
    middleware::auth::CurrentUser,
    models::user::Role,
    AppState,
};

fn ensure_self_or(current: &CurrentUser, id: Uuid, staff_allowed: bool) -> Result<()> {
    let allowed = current.id() == id
        || current.user.role == Role::Admin
        || (staff_allowed && current.user.role.is_staff());
    if allowed {
        Ok(())
    } else {
        Err(Error::Forbidden("You cannot access this user".into()))
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("role" = Option<String>, Query, description = "Exact role"),
        ("department" = Option<String>, Query, description = "Exact department")
    ),
    responses(
        (status = 200, description = "Users sorted by name", body = [UserResponse]),
        (status = 403, description = "Staff only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let users = state.user_service.list(query).await?;
    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    ensure_self_or(&current, id, true)?;
    let user = state.user_service.get(id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    ensure_self_or(&current, id, false)?;
    payload.validate()?;
    let user = state.user_service.update_profile(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Access updated", body = UserResponse),
        (status = 400, description = "Cannot change own role"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse> {
    let user = state
        .user_service
        .update_role(&current.user, id, payload)
        .await?;
    Ok(Json(UserResponse::from(user)))
}
