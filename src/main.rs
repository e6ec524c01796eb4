use clap::Parser;
use iso8583_acquirer::config::Config;
use iso8583_acquirer::http::{router, AppState};
use iso8583_acquirer::registry::standard_field_definitions;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    // RSA keys are loaded lazily by AppState on first use, not here - a
    // missing or malformed key file fails the request that needs it
    // instead of blocking startup.
    let state = Arc::new(AppState::new(
        standard_field_definitions(),
        config.transport_key_path.clone(),
        config.token_key_path.clone(),
        config.allow_list(),
    ));

    let app = router(state, &config.public_dir);
    let addr = format!("0.0.0.0:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(addr, "listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
