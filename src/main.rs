use helpdesk_backend::{
    config::{get_config, init_config, LogFormat},
    database::{seed, store::JsonStore},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let store = JsonStore::open(&config.database_path).await?;
    info!(path = %config.database_path.display(), "database opened");

    if config.seed_demo_users {
        let created = seed::seed_demo_users(&store).await?;
        if created > 0 {
            info!("demo accounts available: admin@helpdesk.local, support@helpdesk.local, user@helpdesk.local");
        }
    }

    let app_state = AppState::new(store, config);

    if config.session_sweep_secs > 0 {
        let state = app_state.clone();
        let every = Duration::from_secs(config.session_sweep_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                match state.auth_service.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "expired sessions purged"),
                    Err(e) => tracing::error!(error = ?e, "session sweep failed"),
                }
            }
        });
    }

    let app = routes::build_router(app_state, config);

    let addr: SocketAddr = config.server_address.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
