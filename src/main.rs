use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use readmigo_edge::config::Args;
use readmigo_edge::rate_limit::RateLimiter;
use readmigo_edge::router::build_router;
use readmigo_edge::session::JwtSessionDecoder;
use readmigo_edge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // one shared client; the timeout bounds every upstream call so a hung
    // upstream surfaces as 502 instead of a hung handler
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.upstream_timeout))
        .build()
        .context("failed to build upstream client")?;

    let state = Arc::new(AppState {
        client,
        upstream_url: args.upstream_url.clone(),
        limiter: RateLimiter::new(),
        sessions: Arc::new(JwtSessionDecoder::new(
            &args.session_secret,
            args.session_cookie.clone(),
        )),
        auth_limit: args.auth_limit,
        general_limit: args.general_limit,
        rate_window: Duration::from_secs(args.rate_window),
    });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(port = args.port, upstream = %args.upstream_url, "edge proxy listening");
    info!(
        auth_limit = args.auth_limit,
        general_limit = args.general_limit,
        window_secs = args.rate_window,
        "rate budgets"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
