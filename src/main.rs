use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use vod_gateway::catalog::ApiClient;
use vod_gateway::logger::init_logger;
use vod_gateway::prelude::*;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("Starting VOD gateway");

    let config = Config::load()?;
    let addr = config.listen_addr()?;

    // 后端不可达不影响代理启动
    let api = ApiClient::from_config(&config.api)?;
    let categories = api.list_categories_or_default().await;
    info!(
        "Backend {} reachable check returned {} categories",
        api.base_url(),
        categories.len()
    );

    let plugin_manager = Arc::new(PluginManager::new());
    let hls_proxy = Arc::new(HlsProxyPlugin::new(&config.proxy));
    if let Err(e) = plugin_manager.register_plugin(hls_proxy.clone()).await {
        error!("Failed to register plugin: {}", e);
        return Err(e.into());
    }

    let mut server = ProxyServer::new(addr);
    server.add_handler(hls_proxy);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (local_addr, server_task) = server.start(async {
        let _ = shutdown_rx.await;
    })?;
    info!("Proxy route available at http://{}{}", local_addr, config.proxy.route);

    start_health_check(plugin_manager.clone());

    wait_for_shutdown().await;

    info!("Shutting down...");
    let _ = shutdown_tx.send(());
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server stopped with error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
    if let Err(e) = plugin_manager.cleanup().await {
        error!("Error during shutdown: {}", e);
    }
    info!("Shutdown complete");

    Ok(())
}

fn start_health_check(plugin_manager: Arc<PluginManager>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
            let health_status = plugin_manager.health_check().await;
            if health_status.values().all(|healthy| *healthy) {
                info!("Plugin health status: {:?}", health_status);
            } else {
                warn!("Plugin health status: {:?}", health_status);
            }
        }
    });
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
