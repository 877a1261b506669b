use axum::{
    extract::State,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    dto::settings_dto::UpdateSettingPayload,
    error::Result,
    routes::extract::{Json, Path},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Map of setting key to JSON value")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_settings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let settings = state.settings_service.all().await?;
    Ok(Json(settings))
}

#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    params(
        ("key" = String, Path, description = "Setting key")
    ),
    request_body = UpdateSettingPayload,
    responses(
        (status = 200, description = "Setting stored"),
        (status = 400, description = "Invalid key"),
        (status = 403, description = "Administrators only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingPayload>,
) -> Result<impl IntoResponse> {
    let setting = state.settings_service.put(&key, payload.value).await?;
    Ok(Json(json!({
        "key": setting.key,
        "value": setting.value,
        "updated_at": setting.updated_at,
    })))
}
