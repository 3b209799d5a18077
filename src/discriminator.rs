use tch::{nn, Tensor};

use crate::error::ConfigError;
use crate::generator::DcganConfig;
use crate::layers::{self, DCGAN_INIT_STDEV};
use crate::network::{self, NetConfig, CHANNELS, IMAGE_SIZE};
use crate::norm::{Normalization, Role, BATCH_AXES};
use crate::residual_block::{ResidualBlock, Resample};

/// Any critic expressed as one sequential graph from images to scores.
#[derive(Debug)]
pub struct SequentialDiscriminator {
    net: nn::SequentialT,
}

impl network::Discriminator for SequentialDiscriminator {
    fn score(&self, images: &Tensor, train: bool) -> Tensor {
        images
            .view([-1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE])
            .apply_t(&self.net, train)
            .view([-1])
    }
}

fn norm(p: nn::Path, channels: i64, cfg: &NetConfig) -> Result<Normalization, ConfigError> {
    Normalization::new(p, channels, &BATCH_AXES, Role::Discriminator, cfg.mode)
}

/// Four strided 5x5 convolutions down to a 4x4 map and a linear score.
pub fn dcgan(
    p: &nn::Path,
    dcgan: DcganConfig,
    cfg: &NetConfig,
) -> Result<SequentialDiscriminator, ConfigError> {
    let dim = cfg.dim;
    let stdev = Some(DCGAN_INIT_STDEV);
    let nl = dcgan.nonlinearity;

    let mut net = nn::seq_t()
        .add(layers::conv2d(p / "conv1", CHANNELS, dim, 5, 2, stdev, true))
        .add_fn(move |xs| nl.apply(xs));
    for (i, (c_in, c_out)) in [(dim, 2 * dim), (2 * dim, 4 * dim), (4 * dim, 8 * dim)]
        .into_iter()
        .enumerate()
    {
        net = net.add(layers::conv2d(p / format!("conv{}", i + 2), c_in, c_out, 5, 2, stdev, true));
        if dcgan.normalize {
            net = net.add(norm(p / format!("bn{}", i + 2), c_out, cfg)?);
        }
        net = net.add_fn(move |xs| nl.apply(xs));
    }
    let net = net
        .add_fn(move |xs| xs.view([-1, 4 * 4 * 8 * dim]))
        .add(layers::linear(p / "output", 4 * 4 * 8 * dim, 1, stdev));

    Ok(SequentialDiscriminator { net })
}

pub fn multiplicative(
    p: &nn::Path,
    normalize: bool,
    cfg: &NetConfig,
) -> Result<SequentialDiscriminator, ConfigError> {
    let dim = cfg.dim;
    let mut net = nn::seq_t()
        .add(layers::conv2d(p / "conv1", CHANNELS, dim * 2, 5, 2, None, true))
        .add_fn(layers::gated);
    for (i, (c_in, c_out)) in [(dim, 2 * dim), (2 * dim, 4 * dim), (4 * dim, 8 * dim)]
        .into_iter()
        .enumerate()
    {
        net = net.add(layers::conv2d(p / format!("conv{}", i + 2), c_in, c_out * 2, 5, 2, None, true));
        if normalize {
            net = net.add(norm(p / format!("bn{}", i + 2), c_out * 2, cfg)?);
        }
        net = net.add_fn(layers::gated);
    }
    let net = net
        .add_fn(move |xs| xs.view([-1, 4 * 4 * 8 * dim]))
        .add(layers::linear(p / "output", 4 * 4 * 8 * dim, 1, None));

    Ok(SequentialDiscriminator { net })
}

/// 101-layer residual critic from 64x64 down to 4x4. Scores are divided by 5.
pub fn resnet(p: &nn::Path, cfg: &NetConfig) -> Result<SequentialDiscriminator, ConfigError> {
    let dim = cfg.dim;
    let mut net = nn::seq_t().add(layers::conv2d(p / "input", CHANNELS, dim / 2, 1, 1, None, true));

    let stages = [
        (64, dim / 2, 5),
        (32, dim, 6),
        (16, 2 * dim, 6),
        (8, 4 * dim, 6),
        (4, 8 * dim, 6),
    ];
    for (stage, &(size, channels, blocks)) in stages.iter().enumerate() {
        if stage > 0 {
            let c_in = stages[stage - 1].1;
            net = net.add(ResidualBlock::new(
                p / format!("down{}", stage),
                c_in,
                channels,
                3,
                Resample::Down,
                cfg,
                Role::Discriminator,
            )?);
        }
        for i in 0..blocks {
            net = net.add(ResidualBlock::new(
                p / format!("{}x{}_{}", size, size, i),
                channels,
                channels,
                3,
                Resample::None,
                cfg,
                Role::Discriminator,
            )?);
        }
    }
    let net = net
        .add_fn(move |xs| xs.view([-1, 4 * 4 * 8 * dim]))
        .add(layers::linear(p / "output", 4 * 4 * 8 * dim, 1, None))
        .add_fn(|xs| xs / 5.);

    Ok(SequentialDiscriminator { net })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::network::{Discriminator, OUTPUT_DIM};
    use tch::{Device, Kind};

    #[test]
    fn scores_one_value_per_example() {
        let vs = nn::VarStore::new(Device::Cpu);
        let cfg = NetConfig::new(Mode::WganGp).with_dim(4);
        let disc = dcgan(&vs.root(), DcganConfig::DISCRIMINATOR, &cfg).unwrap();
        let images = Tensor::rand([5, OUTPUT_DIM], (Kind::Float, Device::Cpu));
        assert_eq!(disc.score(&images, true).size(), vec![5]);
    }

    #[test]
    fn gradient_penalty_critic_has_no_running_statistics() {
        let vs = nn::VarStore::new(Device::Cpu);
        let cfg = NetConfig::new(Mode::WganGp).with_dim(4);
        let _disc = dcgan(&vs.root(), DcganConfig::DISCRIMINATOR, &cfg).unwrap();
        let names: Vec<String> = vs.variables().into_keys().collect();
        assert!(names.iter().any(|n| n.ends_with("gamma")));
        assert!(!names.iter().any(|n| n.contains("running_mean")));
    }
}
