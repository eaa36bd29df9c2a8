use anyhow::Result;

use webaudit_core::AppConfig;
use webaudit_server::service::AuditService;

pub async fn run_serve(mut config: AppConfig, listen: Option<String>) -> Result<()> {
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    webaudit_server::serve(config).await
}

pub async fn run_audit(
    config: AppConfig,
    url: &str,
    nocache: bool,
    snapshot: bool,
    pretty: bool,
) -> Result<()> {
    let service = AuditService::new(&config)?;
    let report = service.audit(url, nocache, snapshot).await?;
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
