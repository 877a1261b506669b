pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::store::JsonStore;
use crate::services::{
    auth_service::AuthService, job_service::JobService, settings_service::SettingsService,
    ticket_service::TicketService, user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub ticket_service: TicketService,
    pub job_service: JobService,
    pub settings_service: SettingsService,
}

impl AppState {
    pub fn new(store: JsonStore, config: &Config) -> Self {
        let auth_service = AuthService::new(store.clone(), config.session_ttl());
        let user_service = UserService::new(store.clone());
        let ticket_service = TicketService::new(store.clone(), user_service.clone());
        let job_service = JobService::new(store.clone());
        let settings_service = SettingsService::new(store);

        Self {
            auth_service,
            user_service,
            ticket_service,
            job_service,
            settings_service,
        }
    }
}
