use anyhow::Result;
use edgecast_core::Config;
use edgecast_weather::MemoryCacheStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    edgecast_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    tracing::info!(
        "Starting edgecast (cache ttl {}s, geolocation {}, weather {})",
        config.cache.ttl_secs,
        config.upstream.geolocation_url,
        config.upstream.weather_url
    );

    let store = Arc::new(MemoryCacheStore::new());

    if let Err(e) = edgecast_server::run(config, store).await {
        tracing::error!("{} ({})", e.user_message(), e);
        return Err(e.into());
    }

    Ok(())
}
