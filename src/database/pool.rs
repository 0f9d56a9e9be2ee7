use crate::config::Config;
use crate::error::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;

/// Builds the process-wide pool. No connection is opened until the first query.
pub fn create_pool(config: &Config) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(&config.database_url)?.database(&config.database_name);
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect_lazy_with(options);
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
