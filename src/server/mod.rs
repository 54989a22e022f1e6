pub mod api;
pub mod origin;

pub use api::{router, serve_on, AppState};
pub use origin::OriginPolicy;

use anyhow::{Context as _, Result};

use crate::config::HubConfig;
use crate::hub::HubHandle;

/// Bind `config.bind` and serve the hub until the server fails
pub async fn start(config: HubConfig, hub: HubHandle) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    serve_on(listener, config, hub).await
}
