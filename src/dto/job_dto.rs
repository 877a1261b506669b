use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::application::ApplicationStatus;
use crate::models::job::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_salary_range"))]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, Default)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateApplicationPayload {
    pub job_id: Uuid,
    #[validate(length(max = 10000))]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateApplicationStatusPayload {
    pub status: ApplicationStatus,
}

fn validate_salary_range(payload: &CreateJobPayload) -> Result<(), ValidationError> {
    match (payload.salary_from, payload.salary_to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new("salary_range")),
        _ => Ok(()),
    }
}
