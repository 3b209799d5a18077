//! Adversarial training of a 4x super-resolution face generator.
//!
//! A run picks one of four objectives ([`Mode`]) and one of seven
//! generator/discriminator pairs ([`architecture::select`]), then alternates
//! critic and generator updates in [`Trainer::train`].

pub mod architecture;
pub mod config;
pub mod data;
pub mod discriminator;
pub mod downsample;
pub mod error;
pub mod export;
pub mod generator;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod mode;
pub mod network;
pub mod norm;
pub mod residual_block;
pub mod trainer;

pub use config::TrainConfig;
pub use error::{ConfigError, GanError};
pub use mode::Mode;
pub use network::{Discriminator, Generator, NetConfig};
pub use trainer::{Termination, Trainer, TrainingReport};
