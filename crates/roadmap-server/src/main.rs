use anyhow::Context;
use roadmap_server::cli::{self, Action};
use roadmap_server::{logging, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    let config = cli::resolve_config(&matches)?;

    if cli::action(&matches) == Action::PrintConfig {
        print!("{}", cli::render_config(&config)?);
        return Ok(());
    }

    logging::init(&config.log).context("invalid log filter")?;
    tracing::info!(
        version = roadmap_server::VERSION,
        bind = %config.bind,
        database = %config.database,
        environment = %config.environment,
        "starting roadmap server"
    );

    let state = AppState::from_config(&config).await?;
    let filter = routes(state, config.max_body_bytes);

    let (addr, server) = warp::serve(filter)
        .try_bind_with_graceful_shutdown(config.bind, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for shutdown signal: {}", e);
            }
        })
        .with_context(|| format!("cannot bind {}", config.bind))?;

    tracing::info!(%addr, "listening");
    server.await;

    tracing::info!("shut down");
    Ok(())
}
