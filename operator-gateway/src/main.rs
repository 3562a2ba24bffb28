//! Entry point for the `obs-operator` HTTP server.

use std::sync::Arc;

use clap::Parser;
use operator_gateway::{
    config::Args,
    routes::{create_router, AppState},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.gateway_config();
    let apiurl = config
        .origin
        .fixed_endpoint()
        .map_or_else(|| "<from Host header>".to_owned(), |e| e.as_str().to_owned());
    let app = create_router(AppState::new(config, Arc::new(args.runner())));
    let addr = args.bind_addr();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %addr,
        apiurl = %apiurl,
        "obs-operator listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
