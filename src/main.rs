use std::{net::SocketAddr, sync::Arc};

use tokio::sync::watch;

use pricewatch::{
    AppState, config, routes,
    services::{
        alert_monitor::{AlertMonitor, spawn_alert_monitor},
        buff::BuffClient,
        discord::DiscordWebhook,
        watchlist_store::WatchlistStore,
    },
    telemetry,
};

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = run().await {
        tracing::error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let settings = config::load();

    if settings.buff_cookie.trim().is_empty() {
        tracing::warn!("BUFF_COOKIE is empty, the price feed will likely refuse requests");
    }
    if settings.discord_webhook_url.trim().is_empty() {
        tracing::warn!("DISCORD_WEBHOOK_URL is empty, alerts will not be delivered");
    }

    let store = Arc::new(WatchlistStore::open(settings.data_file.clone()).await);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = AlertMonitor::new(
        store.clone(),
        Arc::new(BuffClient::from_settings(&settings)),
        Arc::new(DiscordWebhook::from_settings(&settings)),
        settings.check_interval,
        settings.item_delay,
    )
    .with_dedup(settings.dedup);
    let monitor_task = spawn_alert_monitor(monitor, shutdown_rx.clone());

    let state = AppState {
        settings: settings.clone(),
        store,
    };
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("invalid HOST {:?}: {e}", settings.host))?;
    let addr = SocketAddr::from((ip, settings.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;
    tracing::info!("listening on http://{}", addr);

    let mut server_shutdown = shutdown_rx;
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("cannot listen for ctrl-c, running until killed: {e}");
                std::future::pending::<()>().await;
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| format!("server error: {e}"))?;

    if let Err(e) = monitor_task.await {
        tracing::error!("monitor task ended abnormally: {e}");
    }

    Ok(())
}
