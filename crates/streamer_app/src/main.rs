use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use streamer_app::{router, AppState, Settings};
use streamer_engine::{resolve_toolchain, EngineHandle};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    engine_logging::initialize(
        settings.log_destination,
        engine_logging::parse_level(&settings.log_level),
        &settings.log_file,
    );

    let config = settings.engine_config();
    match resolve_toolchain(&config) {
        Ok(toolchain) => engine_info!("Using extractor {:?}", toolchain.extractor.program),
        Err(err) => engine_warn!("{}; downloads will fail until it is installed", err),
    }

    std::fs::create_dir_all(&settings.downloads_dir).with_context(|| {
        format!(
            "creating downloads directory {}",
            settings.downloads_dir.display()
        )
    })?;

    let engine = EngineHandle::new(config);
    let app = router(AppState::new(engine.clone(), settings.downloads_dir.clone()));
    let listener = TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    engine_info!("Listening on {}", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine))
        .await
        .context("server error")?;
    engine_info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, after cancelling every running job so open
/// streams can finish.
async fn shutdown_signal(engine: EngineHandle) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            engine_warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                engine_warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    engine_info!("Shutdown requested; cancelling running jobs");
    engine.shutdown();
}
