// src/signal.rs

use crate::types::PhaseStep;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalPhase {
    Red,
    Yellow,
    Green,
}

impl SignalPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SignalPhase::Red => "RED",
            SignalPhase::Yellow => "YELLOW",
            SignalPhase::Green => "GREEN",
        }
    }
}

/// Repeating traffic-light cycle. Phase is a pure function of elapsed
/// time, so any timestamp maps to the same phase without replaying history.
#[derive(Debug, Clone)]
pub struct PhaseSequence {
    steps: Vec<PhaseStep>,
    cycle: f64,
}

impl PhaseSequence {
    pub fn new(steps: &[PhaseStep]) -> Result<Self> {
        if steps.is_empty() {
            bail!("signal phase sequence must not be empty");
        }
        for step in steps {
            if step.duration <= 0.0 {
                bail!(
                    "signal phase {} has non-positive duration {}",
                    step.phase.label(),
                    step.duration
                );
            }
        }
        let cycle = steps.iter().map(|s| s.duration).sum();
        Ok(Self {
            steps: steps.to_vec(),
            cycle,
        })
    }

    pub fn cycle_length(&self) -> f64 {
        self.cycle
    }

    /// Phase at `elapsed` seconds since the stream epoch.
    pub fn phase_at(&self, elapsed: f64) -> SignalPhase {
        let t = elapsed.rem_euclid(self.cycle);
        let mut acc = 0.0;
        for step in &self.steps {
            acc += step.duration;
            if t < acc {
                return step.phase;
            }
        }
        // Rounding can leave t a hair below cycle but past the last
        // boundary; the cycle wraps back to the first step.
        self.steps[0].phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_sequence() -> PhaseSequence {
        PhaseSequence::new(&[
            PhaseStep {
                phase: SignalPhase::Red,
                duration: 8.0,
            },
            PhaseStep {
                phase: SignalPhase::Green,
                duration: 12.0,
            },
            PhaseStep {
                phase: SignalPhase::Yellow,
                duration: 2.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_phase_at_zero_is_first_phase() {
        let seq = reference_sequence();
        assert_eq!(seq.phase_at(0.0), SignalPhase::Red);
    }

    #[test]
    fn test_reference_cycle_boundaries() {
        let seq = reference_sequence();
        assert_eq!(seq.cycle_length(), 22.0);
        assert_eq!(seq.phase_at(5.0), SignalPhase::Red);
        assert_eq!(seq.phase_at(10.0), SignalPhase::Green);
        assert_eq!(seq.phase_at(21.0), SignalPhase::Yellow);
        assert_eq!(seq.phase_at(22.0), SignalPhase::Red);
    }

    #[test]
    fn test_periodicity() {
        let seq = reference_sequence();
        for i in 0..100 {
            let elapsed = i as f64 * 0.7;
            assert_eq!(
                seq.phase_at(elapsed),
                seq.phase_at(elapsed + seq.cycle_length())
            );
        }
    }

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(PhaseSequence::new(&[]).is_err());
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let steps = [PhaseStep {
            phase: SignalPhase::Red,
            duration: 0.0,
        }];
        assert!(PhaseSequence::new(&steps).is_err());
    }
}
