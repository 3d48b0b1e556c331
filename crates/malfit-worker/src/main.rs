//! Worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use malfit_ai::OpenAiClient;
use malfit_media::{
    check_ffmpeg, check_ffprobe, FfmpegRunner, FfmpegTierRunner, FfprobeProber, LadderExtractor,
};
use malfit_queue::{QueueConfig, RedisJobStore, RedisQueue};
use malfit_worker::{metrics, ArtifactWriter, JobExecutor, JobPipeline, Stages, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("malfit=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting malfit-worker");

    if let Err(e) = run().await {
        error!("Worker failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    check_ffmpeg().context("ffmpeg must be installed")?;
    check_ffprobe().context("ffprobe must be installed")?;

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);
    config
        .ensure_dirs()
        .await
        .context("failed to create working directories")?;

    if let Some(port) = config.metrics_port {
        metrics::install_exporter(port)?;
        info!("Metrics available on port {}", port);
    }

    let queue_config = QueueConfig::from_env();
    let queue = RedisQueue::new(queue_config.clone()).context("failed to create queue client")?;
    queue.ping().await.context("Redis unreachable")?;
    let store = RedisJobStore::new(queue_config).context("failed to create job store")?;

    let ai = Arc::new(OpenAiClient::from_env().context("failed to create AI client")?);
    let prober = Arc::new(FfprobeProber);
    let extractor = LadderExtractor::new(
        prober.clone(),
        Arc::new(FfmpegTierRunner::new(
            FfmpegRunner::new().with_timeout(config.ffmpeg_timeout_secs),
        )),
    );

    let pipeline = JobPipeline::new(
        Arc::new(store),
        prober,
        Stages::new(Arc::new(extractor), ai.clone(), ai),
        ArtifactWriter::new(config.out_dir()),
    );
    let executor = Arc::new(JobExecutor::new(config, Arc::new(queue), Arc::new(pipeline)));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, finishing jobs in hand");
            signal_executor.shutdown();
        }
    });

    executor.run().await;
    Ok(())
}
