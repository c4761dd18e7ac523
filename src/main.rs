use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;
use waypost_server::api::ServiceContainer;
use waypost_server::config::Config;
use waypost_server::services::code_service::CodeService;
use waypost_server::services::profile_service::{ProfileFetcher, WechatProfileClient};
use waypost_server::services::reply_service::ReplyService;
use waypost_server::services::signature_service::SignatureService;
use waypost_server::workers::CodeSweepWorker;
use waypost_server::{api, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    waypost_server::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx, shutdown_rx, sweeper) = async {
        // Phase 1: Shutdown plumbing
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        waypost_server::spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: Component Wiring (Pure logic, no side effects)
        let signatures = SignatureService::new(config.wechat.token.clone());
        let codes = CodeService::new(&config.codes);
        let replies = ReplyService::new(codes.clone());
        let profiles: Arc<dyn ProfileFetcher> = Arc::new(WechatProfileClient::new(config.wechat.clone()));

        let sweeper = CodeSweepWorker::new(codes.clone(), config.codes.clone());
        let services = ServiceContainer { signatures, codes, replies, profiles };

        // Phase 3: Runtime Setup (Listeners and Routers)
        let app_router = api::app_router(config.clone(), services);
        let mgmt_app = api::mgmt_router();

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<_, anyhow::Error>((
            api_listener,
            mgmt_listener,
            app_router,
            mgmt_app,
            shutdown_tx,
            shutdown_rx,
            sweeper,
        ))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Start Runtime (Explicit Spawning and Listening)
    let worker_tasks = vec![tokio::spawn(sweeper.run(shutdown_rx.clone()))];

    let mut api_rx = shutdown_rx.clone();
    let api_server = axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = api_rx.wait_for(|&s| s).await;
        });

    let mut mgmt_rx = shutdown_rx;
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = mgmt_rx.wait_for(|&s| s).await;
        });

    if let Err(e) = tokio::try_join!(api_server, mgmt_server) {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: Graceful Shutdown Orchestration
    let _ = shutdown_tx.send(true);
    tokio::select! {
        () = async {
            futures::future::join_all(worker_tasks).await;
        } => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}
