// src/train.rs

use crate::types::TrainingConfig;
use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::info;

/// Hand the dataset to the external trainer. The training run itself is a
/// black box; this only assembles the invocation and surfaces its exit
/// status.
pub fn run_training(config: &TrainingConfig) -> Result<()> {
    info!(
        "Starting training: {} (model={}, data={}, epochs={}, device={}, batch={})",
        config.command,
        config.base_model,
        config.data_yaml,
        config.epochs,
        config.device,
        config.batch
    );

    let status = Command::new(&config.command)
        .args(["detect", "train"])
        .arg(format!("model={}", config.base_model))
        .arg(format!("data={}", config.data_yaml))
        .arg(format!("epochs={}", config.epochs))
        .arg(format!("device={}", config.device))
        .arg(format!("batch={}", config.batch))
        .status()
        .with_context(|| format!("Failed to launch trainer '{}'", config.command))?;

    if !status.success() {
        bail!("trainer exited with {}", status);
    }

    info!("✓ Training run finished");
    Ok(())
}
