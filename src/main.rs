use anyhow::{anyhow, Result};
use clap::Parser;
use rand::Rng;
use ringkv::{Config, Ring};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// how many written keys are read back after each run
const VERIFY_SAMPLE: usize = 100;

fn main() -> Result<()> {
    let config = Config::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // runtime hosting the node actors
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("ring")
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

struct RunReport {
    replicas: usize,
    elapsed: Duration,
    misses: usize,
}

async fn run(config: Config) -> Result<()> {
    if config.replicas.is_empty() {
        return Err(anyhow!("need at least one band width to time"));
    }

    info!(
        "Timing {} writes on {} nodes for band widths {:?}",
        config.ops, config.nodes, config.replicas
    );

    let mut reports = Vec::with_capacity(config.replicas.len());
    for &replicas in &config.replicas {
        reports.push(time_run(&config, replicas).await?);
    }

    report(&config, &reports);
    Ok(())
}

async fn time_run(config: &Config, replicas: usize) -> Result<RunReport> {
    let ring: Ring<u64, u64> = Ring::with_config(config.ring_config(replicas))?;
    let test_data = generate_writes(config.ops, config.key_range);

    let start = Instant::now();
    for (i, (key, value)) in test_data.iter().enumerate() {
        print_progress(i, test_data.len());
        ring.put_ring(*key, *value);
    }
    ring.await_ring().await;
    let elapsed = start.elapsed();

    // later writes to a key win, so check against the last value written
    let mut misses = 0;
    for (key, value) in test_data.iter().rev().take(VERIFY_SAMPLE) {
        let latest = test_data
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v);
        let found = ring.get_ring(key).await;
        if found != latest {
            warn!(
                "key {} read {:?}, expected {:?} (written {})",
                key, found, latest, value
            );
            misses += 1;
        }
    }

    info!(
        "w={}: {} writes settled in {:?} ({:.2} ops/sec)",
        replicas,
        config.ops,
        elapsed,
        config.ops as f64 / elapsed.as_secs_f64()
    );

    ring.shutdown().await;
    Ok(RunReport {
        replicas,
        elapsed,
        misses,
    })
}

fn report(config: &Config, reports: &[RunReport]) {
    let Some(baseline) = reports.first() else {
        return;
    };
    info!("Scaling on {} nodes, relative to w={}", config.nodes, baseline.replicas);
    for r in reports {
        let ratio = r.elapsed.as_secs_f64() / baseline.elapsed.as_secs_f64().max(f64::EPSILON);
        info!(
            "  w={:<3} {:>12?}  x{:.2}  read-back misses: {}",
            r.replicas, r.elapsed, ratio, r.misses
        );
    }
}

fn generate_writes(num_operations: usize, key_range: u64) -> Vec<(u64, u64)> {
    let mut rng = rand::rng();
    (0..num_operations)
        .map(|_| (rng.random_range(0..key_range.max(1)), rng.random()))
        .collect()
}

fn print_progress(i: usize, total: usize) {
    let step = total / 10;
    if step > 0 && i % step == 0 {
        info!("{}% dispatched", (i * 100) / total);
    }
}
