use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_path: PathBuf,
    pub session_ttl_hours: i64,
    pub session_sweep_secs: u64,
    pub api_rps: u32,
    pub public_rps: u32,
    pub seed_demo_users: bool,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:5000"),
            database_path: PathBuf::from(get_env_or("DATABASE_PATH", "./data/database.json")),
            session_ttl_hours: get_env_parse_or("SESSION_TTL_HOURS", 168)?,
            session_sweep_secs: get_env_parse_or("SESSION_SWEEP_SECS", 0)?,
            api_rps: get_env_parse_or("API_RPS", 50)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 10)?,
            seed_demo_users: get_env_parse_or("SEED_DEMO_USERS", true)?,
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Text)?,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            database_path: PathBuf::from("./data/database.json"),
            session_ttl_hours: 168,
            session_sweep_secs: 0,
            api_rps: 50,
            public_rps: 10,
            seed_demo_users: false,
            log_format: LogFormat::Text,
        }
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
