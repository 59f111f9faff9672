// src/config.rs

use crate::check_region::CheckRegion;
use crate::signal::PhaseSequence;
use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed configuration at startup so the frame loop never
    /// has to deal with it.
    pub fn validate(&self) -> Result<()> {
        PhaseSequence::new(&self.signal.phases)?;
        CheckRegion::from_config(&self.check_region)?;

        if self.model.class_names.is_empty() {
            bail!("model.class_names must not be empty");
        }
        if self.stream.frame_width <= 0 || self.stream.frame_height <= 0 {
            bail!(
                "stream frame dimensions must be positive, got {}x{}",
                self.stream.frame_width,
                self.stream.frame_height
            );
        }
        if self.stream.frame_step == 0 {
            bail!("stream.frame_step must be at least 1");
        }
        for class in &self.detection.violation_classes {
            if !self.model.class_names.contains(class) {
                bail!("violation class '{}' is not in model.class_names", class);
            }
        }
        if !(0.0..=1.0).contains(&self.dataset.subset_ratio)
            || !(0.0..=1.0).contains(&self.dataset.train_ratio)
        {
            bail!("dataset ratios must be within [0, 1]");
        }

        Ok(())
    }
}
