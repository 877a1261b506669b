use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::ticket_dto::{
        AssignTicketPayload, ChangeStatusPayload, CreateCommentPayload, CreateTicketPayload,
        RateTicketPayload, TicketListQuery, TicketStats, UpdateTicketPayload,
    },
    error::Result,
    routes::extract::{Json, Path, Query},
    middleware::auth::CurrentUser,
    models::ticket::Ticket,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/tickets",
    params(
        ("status" = Option<String>, Query, description = "Exact status"),
        ("priority" = Option<String>, Query, description = "Exact priority"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("assigned_to" = Option<Uuid>, Query, description = "Assignee id"),
        ("created_by" = Option<Uuid>, Query, description = "Requester id (staff only)")
    ),
    responses(
        (status = 200, description = "Visible tickets, newest first", body = [Ticket])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<TicketListQuery>,
) -> Result<impl IntoResponse> {
    let tickets = state.ticket_service.list(&current.user, query).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Ticket created", body = Ticket),
        (status = 400, description = "Invalid payload")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state.ticket_service.create(&current.user, payload).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket", body = Ticket),
        (status = 403, description = "Not your ticket"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let ticket = state.ticket_service.get(&current.user, id).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    request_body = UpdateTicketPayload,
    responses(
        (status = 200, description = "Ticket updated", body = Ticket),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state.ticket_service.update(&current.user, id, payload).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = Ticket),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn change_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state
        .ticket_service
        .change_status(&current.user, id, payload.status, payload.note)
        .await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    request_body = AssignTicketPayload,
    responses(
        (status = 200, description = "Assignment changed", body = Ticket),
        (status = 400, description = "Assignee is not active staff"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn assign_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignTicketPayload>,
) -> Result<impl IntoResponse> {
    let ticket = state
        .ticket_service
        .assign(&current.user, id, payload.assigned_to)
        .await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/comments",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    request_body = CreateCommentPayload,
    responses(
        (status = 201, description = "Comment added", body = Ticket),
        (status = 403, description = "Not your ticket"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state
        .ticket_service
        .add_comment(&current.user, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/rating",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    request_body = RateTicketPayload,
    responses(
        (status = 200, description = "Rating stored", body = Ticket),
        (status = 403, description = "Only the requester can rate"),
        (status = 409, description = "Ticket is not resolved or closed")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn rate_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateTicketPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state.ticket_service.rate(&current.user, id, payload).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 204, description = "Ticket deleted"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.ticket_service.delete(&current.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/tickets/stats",
    responses(
        (status = 200, description = "Queue statistics", body = TicketStats),
        (status = 403, description = "Staff only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn ticket_stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let stats = state.ticket_service.stats(&current.user).await?;
    Ok(Json(stats))
}
