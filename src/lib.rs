mod application;
mod domain;
mod infrastructure;
mod interfaces;

#[cfg(test)]
mod test_support;

use std::io;

use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::storage::ensure_upload_dir;
use crate::interfaces::http::start_server;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Loads configuration, prepares the upload directory and serves until shutdown.
pub fn run() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    tracing::info!(?config, "Configuration loaded");
    ensure_upload_dir(&config.storage.upload_dir())?;

    let address = format!("{}:{}", config.server.host, config.server.port);

    actix_web::rt::System::new().block_on(async move {
        let server = start_server(config)?;
        tracing::info!(address = %address, "HTTP server started");
        server.await
    })
}
