use artifact_cache_domain::Config;
use tracing::info;

pub fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    let config = Config::load(config_path)?;
    config.validate()?;
    Ok(config)
}

/// Logged separately since the subscriber depends on the loaded config.
pub fn log_config(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.unwrap_or("default"),
        store = ?config.cache.store,
        watch_period_ms = config.cache.watch_period_ms,
        stale_while_revalidate = config.cache.stale_while_revalidate,
        "Configuration loaded"
    );
}
