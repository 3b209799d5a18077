use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::architecture;
use crate::downsample::DownsampleMethod;
use crate::error::ConfigError;
use crate::mode::Mode;
use crate::network::NetConfig;

/// Everything a training run is parameterized by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub mode: Mode,
    pub data_dir: PathBuf,
    /// Output directory for images and the metrics log.
    pub train_dir: PathBuf,
    pub summary_dir: PathBuf,
    pub max_runtime_minutes: f64,
    pub max_iterations: u64,
    pub gradient_penalty_lambda: f64,
    pub generator_l1_weight: f64,
    pub architecture_index: usize,
    pub batch_size: i64,
    pub dim: i64,
    pub downsample_factor: i64,
    pub downsample_method: DownsampleMethod,
    /// Equal batch splits whose losses are averaged before each update.
    pub towers: i64,
    pub seed: Option<u64>,
    /// Delete `train_dir` before the run.
    pub clean_train_dir: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            mode: Mode::WganGp,
            data_dir: PathBuf::from("data/celebA_64x64"),
            train_dir: PathBuf::from("train"),
            summary_dir: PathBuf::from("summary"),
            max_runtime_minutes: 20.,
            max_iterations: 500,
            gradient_penalty_lambda: 10.,
            generator_l1_weight: 0.9,
            architecture_index: 0,
            batch_size: 16,
            dim: 64,
            downsample_factor: 4,
            downsample_method: DownsampleMethod::Conv,
            towers: 1,
            seed: None,
            clean_train_dir: true,
        }
    }
}

impl TrainConfig {
    /// Checks every setup invariant. Performs no I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDataDir);
        }
        architecture::select(self.architecture_index)?;
        self.net_config().validate()?;
        self.max_runtime()?;
        if self.towers <= 0 || self.batch_size <= 0 || self.batch_size % self.towers != 0 {
            return Err(ConfigError::InvalidBatchSize {
                batch_size: self.batch_size,
                towers: self.towers,
            });
        }
        Ok(())
    }

    pub fn net_config(&self) -> NetConfig {
        NetConfig::new(self.mode)
            .with_dim(self.dim)
            .with_downsample_factor(self.downsample_factor)
    }

    /// Wall-clock budget. Negative budgets count as zero; NaN, infinite and
    /// overflowing ones are rejected.
    pub fn max_runtime(&self) -> Result<Duration, ConfigError> {
        let minutes = self.max_runtime_minutes;
        if !minutes.is_finite() {
            return Err(ConfigError::InvalidRuntime(minutes));
        }
        Duration::try_from_secs_f64(minutes.max(0.) * 60.)
            .map_err(|_| ConfigError::InvalidRuntime(minutes))
    }
}
