use scholarship_backend::{
    build_router,
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    error::Error,
    services::stats_service::check_report_timezone,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
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

    let pool = create_pool(config)?;

    // Not fatal: requests report storage failures on their own.
    if let Err(e) = run_migrations(&pool).await {
        tracing::error!(error = ?e, "Failed to apply database migrations");
    }

    match check_report_timezone(&pool, &config.report_timezone).await {
        Ok(()) => {}
        Err(e @ Error::Config(_)) => return Err(e.into()),
        Err(e) => tracing::warn!(error = ?e, "Could not verify REPORT_TIMEZONE"),
    }

    let app = build_router(AppState::new(pool, config), config.public_rps);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
