use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use std::collections::HashMap;

use crate::{
    error::Result, middleware::auth::CurrentUser, services::export_service::ExportService,
    AppState,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Export every ticket as XLSX
#[utoipa::path(
    get,
    path = "/api/tickets/export",
    responses(
        (status = 200, description = "XLSX workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 403, description = "Staff only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn export_tickets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let tickets = state.ticket_service.all_for_export(&current.user).await?;

    let user_names: HashMap<_, _> = state
        .user_service
        .list(Default::default())
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let buffer = ExportService::generate_tickets_xlsx(&tickets, &user_names)?;
    let filename = format!(
        "tickets_export_{}.xlsx",
        chrono::Utc::now().format("%Y%m%d_%H%M")
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
