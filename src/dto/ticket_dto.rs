use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::ticket::{Priority, TicketStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTicketPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    #[schema(value_type = Option<String>)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, Default)]
pub struct UpdateTicketPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub priority: Option<Priority>,
    #[schema(value_type = Option<String>)]
    pub status: Option<TicketStatus>,
    /// Absent leaves the assignee alone, `null` unassigns.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Keeps an explicit `null` apart from a missing field.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusPayload {
    #[schema(value_type = String)]
    pub status: TicketStatus,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignTicketPayload {
    /// `null` clears the assignment.
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCommentPayload {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RateTicketPayload {
    #[validate(range(min = 1, max = 5))]
    pub score: u8,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TicketListQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub unassigned_open: usize,
    pub rated: usize,
    pub average_rating: Option<f64>,
}
