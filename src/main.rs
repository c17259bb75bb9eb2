//! Main entry point for the deepfake detection server.
//!
//! Loads `.env`, installs structured logging, builds the shared state and
//! serves the `/api` routes until Ctrl-C.

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use deepfake_server::{
    AppState, DetectorConfig, RequestLoggingMiddleware, ServerConfig, get_subscriber, handlers, init_subscriber,
};
use dotenv::dotenv;
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber("deepfake".to_string(), "info".to_string(), std::io::stdout);
    init_subscriber(subscriber)?;
    handlers::health::mark_start();

    let server_config = ServerConfig::from_env()?;
    let app_state = AppState::new(DetectorConfig::from_env()?, &server_config)?;

    if app_state.detector.api_key().is_err() {
        tracing::warn!("GEMINI_API_KEY is not set; detection requests will fail");
    }
    match &app_state.store {
        Some(_) if app_state.persist_results => tracing::info!("result persistence enabled"),
        Some(_) => tracing::info!("history store configured, persistence disabled"),
        None => tracing::info!("no history store configured"),
    }

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(RequestLoggingMiddleware::new())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(handlers::configure_routes)
    })
    .bind((server_config.host.as_str(), server_config.port))?
    .run();

    tracing::info!(
        host = %server_config.host,
        port = server_config.port,
        "server listening"
    );

    let srv_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("shutdown signal received");
            srv_handle.stop(true).await;
        }
        res = server_task => {
            match res {
                Ok(Err(e)) => tracing::error!(error = %e, "server stopped with error"),
                Err(e) => tracing::error!(error = %e, "server task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
