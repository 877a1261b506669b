pub mod auth_service;
pub mod export_service;
pub mod job_service;
pub mod settings_service;
pub mod ticket_service;
pub mod user_service;
