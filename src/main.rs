use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

mod app;
mod clock;
mod config;
mod db;
mod error;
mod http;
mod models;
mod services;
#[cfg(test)]
mod test_utils;

use app::App;
use config::Config;
use http::AppState;

enum Mode {
    Serve,
    RegenerateLinks,
    QualityReport,
}

struct Args {
    config_path: Option<PathBuf>,
    mode: Mode,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args {
        config_path: None,
        mode: Mode::Serve,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--regenerate-links" => parsed.mode = Mode::RegenerateLinks,
            "--quality-report" => parsed.mode = Mode::QualityReport,
            other => anyhow::bail!(
                "unknown argument {:?}\nusage: bpharm-seo [--config <path>] [--regenerate-links | --quality-report]",
                other
            ),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bpharm_seo=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    let app = App::new(&config)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path))?;

    // Headless batch modes print JSON and exit
    match args.mode {
        Mode::RegenerateLinks => {
            let summary = app.linking.regenerate_all_links().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            app.shutdown().await;
            return Ok(());
        }
        Mode::QualityReport => {
            let report = app.quality.generate_report().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            app.shutdown().await;
            return Ok(());
        }
        Mode::Serve => {}
    }

    let state = Arc::new(AppState {
        app,
        admin_token: config.admin_token.clone(),
    });
    if state.admin_token.is_none() {
        tracing::warn!("No admin_token configured; admin routes are unauthenticated");
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, base_url = %config.base_url, "Listening");

    axum::serve(listener, http::build_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    match Arc::try_unwrap(state) {
        Ok(state) => state.app.shutdown().await,
        Err(_) => tracing::debug!("Router state still shared at exit"),
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
