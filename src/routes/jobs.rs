use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        CreateApplicationPayload, CreateJobPayload, JobListQuery, UpdateApplicationStatusPayload,
        UpdateJobPayload,
    },
    error::Result,
    routes::extract::{Json, Path, Query},
    middleware::auth::CurrentUser,
    models::{application::Application, job::Job},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("status" = Option<String>, Query, description = "open or closed"),
        ("department" = Option<String>, Query, description = "Exact department")
    ),
    responses(
        (status = 200, description = "Jobs, newest first", body = [Job])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list_jobs(query).await?;
    Ok(Json(jobs))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_job(id).await?;
    Ok(Json(job))
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job posted", body = Job),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Staff only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.create_job(&current.user, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    put,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = UpdateJobPayload,
    responses(
        (status = 200, description = "Job updated", body = Job),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state
        .job_service
        .update_job(&current.user, id, payload)
        .await?;
    Ok(Json(job))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    responses(
        (status = 200, description = "Applications visible to the caller", body = [Application])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let applications = state.job_service.list_applications(&current.user).await?;
    Ok(Json(applications))
}

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Application),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job closed or already applied")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state.job_service.apply(&current.user, payload).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateApplicationStatusPayload,
    responses(
        (status = 200, description = "Application status updated", body = Application),
        (status = 403, description = "Job poster or administrator only"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateApplicationStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .job_service
        .update_application_status(&current.user, id, payload.status)
        .await?;
    Ok(Json(application))
}
