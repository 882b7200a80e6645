//! # Artifact Cache
//!
//! Drives a configured cache chain with a synthetic build step: a burst of
//! concurrent cold reads, then a burst of reads after the key is marked
//! stale, and prints what the cache did.

mod bootstrap;

use artifact_cache_application::ports::loader_fn;
use artifact_cache_domain::{CacheError, CacheKey, CacheValue, ResourceType};
use artifact_cache_infrastructure::{CacheChain, CacheChainBuilder};
use clap::Parser;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "artifact-cache")]
#[command(version)]
#[command(about = "Exercise a build-artifact cache chain")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Group whose artifact is requested
    #[arg(short = 'g', long, default_value = "main")]
    group: String,

    /// Resource type of the artifact (js or css)
    #[arg(short = 't', long, default_value = "js")]
    resource_type: ResourceType,

    /// Request the non-minimized artifact
    #[arg(long)]
    no_minimize: bool,

    /// Concurrent readers per burst
    #[arg(short = 'n', long, default_value_t = 8)]
    callers: usize,

    /// Simulated build time in milliseconds
    #[arg(long, default_value_t = 50)]
    load_delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref())?;
    bootstrap::init_logging(&config.logging);
    bootstrap::config::log_config(cli.config.as_deref(), &config);

    let key = CacheKey::new(cli.group.as_str(), cli.resource_type, !cli.no_minimize);
    key.validate()?;

    let load_delay = Duration::from_millis(cli.load_delay_ms);
    let builds = Arc::new(AtomicU64::new(0));
    let build_counter = Arc::clone(&builds);
    let loader = loader_fn(move |key: CacheKey| {
        let build = build_counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            tokio::time::sleep(load_delay).await;
            Ok(CacheValue::from_content(format!("/* {key}, build {build} */\n")))
        }
    });

    let chain = CacheChainBuilder::new(config.cache.clone(), Arc::new(loader)).build()?;

    let cold = burst(&chain, &key, cli.callers).await?;
    info!(
        readers = cli.callers,
        distinct_values = cold.distinct,
        elapsed_ms = cold.elapsed.as_millis() as u64,
        "Cold burst finished"
    );

    if chain.mark_as_stale(&key)? {
        info!(key = %key, "Marked as stale");
    }

    let stale = burst(&chain, &key, cli.callers).await?;
    info!(
        readers = cli.callers,
        distinct_values = stale.distinct,
        elapsed_ms = stale.elapsed.as_millis() as u64,
        "Stale burst finished"
    );

    // let a background refresh land before reading the final value
    tokio::time::sleep(load_delay * 2).await;
    let value = chain.get(&key).await?;

    let snapshot = chain.metrics().snapshot();
    println!("key:              {key}");
    println!("final hash:       {}", value.hash());
    println!("builds:           {}", builds.load(Ordering::SeqCst));
    println!("hits:             {}", snapshot.hits);
    println!("stale hits:       {}", snapshot.stale_hits);
    println!("misses:           {}", snapshot.misses);
    println!("loads:            {}", snapshot.loads);
    println!("refreshes:        {}", snapshot.refreshes);
    println!("hit rate:         {:.1}%", chain.metrics().hit_rate());

    chain.destroy();
    Ok(())
}

struct BurstReport {
    distinct: usize,
    elapsed: Duration,
}

async fn burst(
    chain: &CacheChain,
    key: &CacheKey,
    callers: usize,
) -> Result<BurstReport, CacheError> {
    let start = Instant::now();
    let results = futures::future::join_all((0..callers).map(|_| chain.get(key))).await;
    let values = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let distinct = values
        .iter()
        .map(|v| v.hash().to_string())
        .collect::<HashSet<_>>()
        .len();

    Ok(BurstReport {
        distinct,
        elapsed: start.elapsed(),
    })
}
