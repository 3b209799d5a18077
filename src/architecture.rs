//! Registry of the generator/discriminator pairs selectable per run.

use tch::nn;

use crate::discriminator;
use crate::error::ConfigError;
use crate::generator::{self, DcganConfig};
use crate::layers::Nonlinearity;
use crate::network::{Discriminator, Generator, NetConfig};

pub const ARCHITECTURE_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Dcgan(DcganConfig),
    CrippledDcgan,
    FullyConnected,
    Multiplicative { normalize: bool },
    Resnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscriminatorKind {
    Dcgan(DcganConfig),
    Multiplicative { normalize: bool },
    Resnet,
}

impl GeneratorKind {
    pub fn build(self, p: &nn::Path, cfg: &NetConfig) -> Result<Box<dyn Generator>, ConfigError> {
        cfg.validate()?;
        Ok(match self {
            GeneratorKind::Dcgan(dcgan) => Box::new(generator::dcgan(p, dcgan, cfg)?),
            GeneratorKind::CrippledDcgan => Box::new(generator::crippled_dcgan(p, cfg)),
            GeneratorKind::FullyConnected => Box::new(generator::fully_connected(p, cfg)),
            GeneratorKind::Multiplicative { normalize } => {
                Box::new(generator::multiplicative(p, normalize, cfg)?)
            }
            GeneratorKind::Resnet => Box::new(generator::resnet(p, cfg)?),
        })
    }
}

impl DiscriminatorKind {
    pub fn build(
        self,
        p: &nn::Path,
        cfg: &NetConfig,
    ) -> Result<Box<dyn Discriminator>, ConfigError> {
        cfg.validate()?;
        Ok(match self {
            DiscriminatorKind::Dcgan(dcgan) => Box::new(discriminator::dcgan(p, dcgan, cfg)?),
            DiscriminatorKind::Multiplicative { normalize } => {
                Box::new(discriminator::multiplicative(p, normalize, cfg)?)
            }
            DiscriminatorKind::Resnet => Box::new(discriminator::resnet(p, cfg)?),
        })
    }
}

/// Looks up the architecture pair registered under `index`.
pub fn select(index: usize) -> Result<(GeneratorKind, DiscriminatorKind), ConfigError> {
    let no_norm_g = DcganConfig {
        normalize: false,
        ..DcganConfig::GENERATOR
    };
    let no_norm_d = DcganConfig {
        normalize: false,
        ..DcganConfig::DISCRIMINATOR
    };
    let tanh_g = DcganConfig {
        nonlinearity: Nonlinearity::Tanh,
        ..DcganConfig::GENERATOR
    };
    let tanh_d = DcganConfig {
        nonlinearity: Nonlinearity::Tanh,
        ..DcganConfig::DISCRIMINATOR
    };

    let pair = match index {
        // baseline
        0 => (
            GeneratorKind::Dcgan(DcganConfig::GENERATOR),
            DiscriminatorKind::Dcgan(DcganConfig::DISCRIMINATOR),
        ),
        1 => (
            GeneratorKind::CrippledDcgan,
            DiscriminatorKind::Dcgan(DcganConfig::DISCRIMINATOR),
        ),
        2 => (
            GeneratorKind::FullyConnected,
            DiscriminatorKind::Dcgan(DcganConfig::DISCRIMINATOR),
        ),
        3 => (GeneratorKind::Dcgan(no_norm_g), DiscriminatorKind::Dcgan(no_norm_d)),
        4 => (
            GeneratorKind::Multiplicative { normalize: true },
            DiscriminatorKind::Multiplicative { normalize: true },
        ),
        5 => (GeneratorKind::Dcgan(tanh_g), DiscriminatorKind::Dcgan(tanh_d)),
        6 => (GeneratorKind::Resnet, DiscriminatorKind::Resnet),
        other => return Err(ConfigError::UnknownArchitecture(other)),
    };
    Ok(pair)
}
