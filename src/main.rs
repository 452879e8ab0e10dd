//! Windsurf backend - calculator and dashboard API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use windsurf_backend::{config::Args, logging, server, AppState, AuthMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Windsurf Backend API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Auth mode: {}", args.auth_mode);
    info!("Issuer: {}", args.oidc_issuer);
    info!("JWKS: {}", args.jwks_uri());
    info!("Data API: {}", args.data_api_url);
    if args.auth_mode == AuthMode::Bypass {
        warn!("Requests without a valid token will be let through - do not expose this instance");
    }

    let state = Arc::new(AppState::new(args));
    server::run(state).await?;

    Ok(())
}
