mod cli;

use clap::Parser;
use cli::Cli;
use log::info;
use meteomap::{router, AppState, MeteostatSource, WeatherResolver};
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;

    let source = Arc::new(
        MeteostatSource::open()
            .maybe_cache_folder(config.cache_dir.clone())
            .max_age(config.max_age)
            .search(config.search)
            .call()
            .await?,
    );
    info!("Loaded {} weather stations", source.station_count());

    let resolver = WeatherResolver::builder()
        .observations(source.clone())
        .stations(source)
        .window(config.window)
        .fallback_station_name(config.fallback_station_name.clone())
        .build();
    let app = router(AppState::new(resolver, config.messages.clone()));

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        "Serving the weather map on http://{} (observation window {})",
        listener.local_addr()?,
        config.window
    );
    axum::serve(listener, app).await?;
    Ok(())
}
