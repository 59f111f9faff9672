// src/main.rs

mod check_region;
mod config;
mod dataset;
mod detection;
mod frame_source;
mod renderer;
mod server;
mod signal;
mod stream;
mod tracker;
mod train;
mod types;
mod violation;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::info;
use types::Config;

const USAGE: &str = "usage: violation-detection [stream | annotate-lights | convert-labels | split-dataset | train] [config.yaml]";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("stream");
    let config_path = args.get(2).map(String::as_str).unwrap_or("config.yaml");

    let config = Config::load(config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "violation_detection={},ort=warn",
            config.logging.level
        ))
        .init();

    info!("🚥 Traffic violation detection starting");
    info!("✓ Configuration loaded from {}", config_path);

    match command {
        "stream" => run_stream(config).await,
        "annotate-lights" => dataset::light_overlay::annotate_lights(&config.dataset.overlay),
        "convert-labels" => dataset::labels::write_label_files(
            &config.dataset,
            config.stream.frame_width as f64,
            config.stream.frame_height as f64,
        ),
        "split-dataset" => dataset::split::split_dataset(&config.dataset),
        "train" => train::run_training(&config.training),
        other => {
            anyhow::bail!("unknown command '{}'\n{}", other, USAGE)
        }
    }
}

async fn run_stream(config: Config) -> Result<()> {
    let session = stream::StreamSession::new(&config)?;
    info!("✓ Stream session ready");

    let (frames_tx, _) = broadcast::channel::<Bytes>(8);
    let producer = stream::spawn_producer(session, frames_tx.clone());

    let result = server::serve(&config.stream, frames_tx).await;
    producer.abort();
    result
}
