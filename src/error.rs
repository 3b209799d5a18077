use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup errors. All of them are raised before the first training step.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown mode `{0}`, expected one of wgan, wgan-gp, dcgan, lsgan")]
    UnknownMode(String),
    #[error("unknown architecture index {0}, expected 0..={max}", max = crate::architecture::ARCHITECTURE_COUNT - 1)]
    UnknownArchitecture(usize),
    #[error("data directory must be specified")]
    MissingDataDir,
    #[error("invalid resample value `{0}`, expected none, down or up")]
    InvalidResample(String),
    #[error("per-example normalization over axes {0:?} is unsupported")]
    UnsupportedNormAxes(Vec<i64>),
    #[error("downsample factor {0} does not divide the image size")]
    InvalidDownsampleFactor(i64),
    #[error("batch size {batch_size} is not a multiple of {towers} towers")]
    InvalidBatchSize { batch_size: i64, towers: i64 },
    #[error("unknown downsample method `{0}`, expected conv or area")]
    UnknownDownsampleMethod(String),
    #[error("max runtime of {0} minutes is not a representable duration")]
    InvalidRuntime(f64),
}

#[derive(Debug, Error)]
pub enum GanError {
    #[error("configuration error -> {0}")]
    Config(#[from] ConfigError),
    #[error("torch failure -> {0}")]
    Torch(#[from] tch::TchError),
    #[error("io failure -> {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failure -> {0}")]
    Json(#[from] serde_json::Error),
    #[error("batch size must be positive, got {0}")]
    NonPositiveBatchSize(i64),
    #[error("batch stream ended")]
    StreamEnded,
    #[error("expected images of shape [N, 3, 64, 64], got {0:?}")]
    ImageShape(Vec<i64>),
    #[error("dataset at {path:?} holds {found} images, need at least {needed}")]
    EmptyDataset {
        path: PathBuf,
        found: i64,
        needed: i64,
    },
}

pub type Result<T, E = GanError> = std::result::Result<T, E>;
