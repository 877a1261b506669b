pub mod auth_dto;
pub mod job_dto;
pub mod settings_dto;
pub mod ticket_dto;
pub mod user_dto;
