use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::{
    auth_dto::{AuthResponse, LoginPayload, RegisterPayload},
    job_dto::{
        CreateApplicationPayload, CreateJobPayload, UpdateApplicationStatusPayload,
        UpdateJobPayload,
    },
    settings_dto::UpdateSettingPayload,
    ticket_dto::{
        AssignTicketPayload, ChangeStatusPayload, CreateCommentPayload, CreateTicketPayload,
        RateTicketPayload, TicketStats, UpdateTicketPayload,
    },
    user_dto::{UpdateProfilePayload, UpdateRolePayload, UserResponse},
};
use crate::models::{
    application::{Application, ApplicationStatus},
    job::{Job, JobStatus},
    ticket::{Comment, Rating, StatusChange, Ticket},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::tickets::list_tickets,
        crate::routes::tickets::create_ticket,
        crate::routes::tickets::get_ticket,
        crate::routes::tickets::update_ticket,
        crate::routes::tickets::change_status,
        crate::routes::tickets::assign_ticket,
        crate::routes::tickets::add_comment,
        crate::routes::tickets::rate_ticket,
        crate::routes::tickets::delete_ticket,
        crate::routes::tickets::ticket_stats,
        crate::routes::export::export_tickets,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::update_user_role,
        crate::routes::jobs::list_jobs,
        crate::routes::jobs::get_job,
        crate::routes::jobs::create_job,
        crate::routes::jobs::update_job,
        crate::routes::jobs::list_applications,
        crate::routes::jobs::create_application,
        crate::routes::jobs::update_application_status,
        crate::routes::settings::list_settings,
        crate::routes::settings::put_setting,
    ),
    components(
        schemas(
            RegisterPayload,
            LoginPayload,
            AuthResponse,
            UserResponse,
            UpdateProfilePayload,
            UpdateRolePayload,
            Ticket,
            Comment,
            StatusChange,
            Rating,
            CreateTicketPayload,
            UpdateTicketPayload,
            ChangeStatusPayload,
            AssignTicketPayload,
            CreateCommentPayload,
            RateTicketPayload,
            TicketStats,
            Job,
            JobStatus,
            Application,
            ApplicationStatus,
            CreateJobPayload,
            UpdateJobPayload,
            CreateApplicationPayload,
            UpdateApplicationStatusPayload,
            UpdateSettingPayload,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "helpdesk", description = "IT helpdesk ticketing API")
    )
)]
pub struct ApiDoc;

#[axum::debug_handler]
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
