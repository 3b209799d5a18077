use std::fmt::Debug;

use tch::{Device, Kind, Tensor};

use crate::error::ConfigError;
use crate::mode::Mode;

/// Side length of the square training images.
pub const IMAGE_SIZE: i64 = 64;
pub const CHANNELS: i64 = 3;
/// Length of one flattened full-resolution image.
pub const OUTPUT_DIM: i64 = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// Build-time parameters shared by every network constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetConfig {
    /// Base channel width.
    pub dim: i64,
    pub downsample_factor: i64,
    pub mode: Mode,
}

impl NetConfig {
    pub fn new(mode: Mode) -> Self {
        NetConfig {
            dim: 64,
            downsample_factor: 4,
            mode,
        }
    }

    pub fn with_dim(mut self, dim: i64) -> Self {
        self.dim = dim;
        self
    }

    pub fn with_downsample_factor(mut self, factor: i64) -> Self {
        self.downsample_factor = factor;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let k = self.downsample_factor;
        if k <= 0 || IMAGE_SIZE % k != 0 {
            return Err(ConfigError::InvalidDownsampleFactor(k));
        }
        Ok(())
    }

    /// Side length of the conditioning image.
    pub fn cond_size(&self) -> i64 {
        IMAGE_SIZE / self.downsample_factor
    }

    /// Length of one flattened conditioning vector.
    pub fn input_dim(&self) -> i64 {
        CHANNELS * self.cond_size() * self.cond_size()
    }
}

/// Maps conditioning vectors `[n, input_dim]` to images `[n, OUTPUT_DIM]` in (-1, 1).
pub trait Generator: Debug {
    fn generate(&self, n_samples: i64, conditioning: Option<&Tensor>, train: bool) -> Tensor;
}

/// Maps images `[n, OUTPUT_DIM]` to one unbounded score per example, shape `[n]`.
pub trait Discriminator: Debug {
    fn score(&self, images: &Tensor, train: bool) -> Tensor;
}

/// The supplied conditioning, or fresh standard-normal noise of the same shape.
pub(crate) fn input_or_noise(
    n_samples: i64,
    conditioning: Option<&Tensor>,
    input_dim: i64,
    device: Device,
) -> Tensor {
    match conditioning {
        Some(xs) => xs.shallow_clone(),
        None => Tensor::randn([n_samples, input_dim], (Kind::Float, device)),
    }
}
