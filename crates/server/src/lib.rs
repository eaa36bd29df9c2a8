pub mod routes;
pub mod service;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use webaudit_core::AppConfig;

use crate::service::AuditService;

/// Bind and serve until shutdown.
pub async fn serve(config: AppConfig) -> Result<()> {
    let listen = config.server.listen.clone();
    let service = Arc::new(AuditService::new(&config)?);
    let app = routes::build_router(service);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(addr = %listen, "audit server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
