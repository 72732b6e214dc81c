// Entrypoint for the admin console.
// - Loads `.env`, sets up logging and configuration.
// - Builds the one session manager and the API client that shares it,
//   then hands control to the interactive menu.

use anyhow::Context;
use sota_admin_cli::{
    api::ApiClient, config::ClientConfig, session::SessionManager, storage::FileStore,
    ui::main_menu,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let http = config.http_client().context("Failed to build HTTP client")?;
    info!(
        base_url = %config.base_url,
        session_file = %config.session_file.display(),
        "starting admin console"
    );

    let storage = Arc::new(FileStore::new(config.session_file.clone()));
    let session = Arc::new(SessionManager::new(storage, http.clone(), &config.base_url));
    session.subscribe(|state| {
        info!(authenticated = state.authenticated, "session state changed");
    });
    session.initialize();

    let api = ApiClient::new(http, &config.base_url, session);
    main_menu(api)?;
    Ok(())
}
