use tch::{nn, Device, Tensor};

use crate::error::ConfigError;
use crate::layers::{self, Nonlinearity, DCGAN_INIT_STDEV};
use crate::network::{self, NetConfig, CHANNELS, IMAGE_SIZE, OUTPUT_DIM};
use crate::norm::{Normalization, Role, BATCH_AXES};
use crate::residual_block::{ResidualBlock, Resample};

/// Hidden width of the fully connected generator.
pub const FC_DIM: i64 = 512;

/// Options of the DCGAN-family constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcganConfig {
    pub normalize: bool,
    pub nonlinearity: Nonlinearity,
}

impl DcganConfig {
    pub const GENERATOR: DcganConfig = DcganConfig {
        normalize: true,
        nonlinearity: Nonlinearity::Relu,
    };
    pub const DISCRIMINATOR: DcganConfig = DcganConfig {
        normalize: true,
        nonlinearity: Nonlinearity::LeakyRelu,
    };
}

/// Any generator expressed as one sequential graph over the conditioning vector.
#[derive(Debug)]
pub struct SequentialGenerator {
    net: nn::SequentialT,
    input_dim: i64,
    device: Device,
}

impl network::Generator for SequentialGenerator {
    fn generate(&self, n_samples: i64, conditioning: Option<&Tensor>, train: bool) -> Tensor {
        network::input_or_noise(n_samples, conditioning, self.input_dim, self.device)
            .apply_t(&self.net, train)
            .view([-1, OUTPUT_DIM])
    }
}

fn maybe_norm(
    net: nn::SequentialT,
    p: nn::Path,
    channels: i64,
    normalize: bool,
    cfg: &NetConfig,
) -> Result<nn::SequentialT, ConfigError> {
    if !normalize {
        return Ok(net);
    }
    let norm = Normalization::new(p, channels, &BATCH_AXES, Role::Generator, cfg.mode)?;
    Ok(net.add(norm))
}

/// Two strided convolutions from the conditioning image to `[n, 8 * dim, 4, 4]`.
/// Without normalization the encoder stays affine.
fn encoder(
    p: &nn::Path,
    dcgan: DcganConfig,
    cfg: &NetConfig,
) -> Result<nn::SequentialT, ConfigError> {
    let (dim, cs) = (cfg.dim, cfg.cond_size());
    let stdev = Some(DCGAN_INIT_STDEV);
    let nl = dcgan.nonlinearity;

    let mut net = nn::seq_t().add_fn(move |xs| xs.view([-1, CHANNELS, cs, cs]));
    for (i, (c_in, c_out)) in [(CHANNELS, 4 * dim), (4 * dim, 8 * dim)].into_iter().enumerate() {
        net = net.add(layers::conv2d(p / format!("encoder{}", i + 1), c_in, c_out, 5, 2, stdev, true));
        if dcgan.normalize {
            let norm = Normalization::new(
                p / format!("bn_encoder{}", i + 1),
                c_out,
                &BATCH_AXES,
                Role::Generator,
                cfg.mode,
            )?;
            net = net.add(norm).add_fn(move |xs| nl.apply(xs));
        }
    }
    Ok(net)
}

/// Encodes the conditioning image with two strided convolutions, then decodes
/// it with four transposed convolutions.
pub fn dcgan(
    p: &nn::Path,
    dcgan: DcganConfig,
    cfg: &NetConfig,
) -> Result<SequentialGenerator, ConfigError> {
    let (dim, cs) = (cfg.dim, cfg.cond_size());
    // 2 encoder halvings, 4 decoder doublings
    if cs * 4 != IMAGE_SIZE {
        return Err(ConfigError::InvalidDownsampleFactor(cfg.downsample_factor));
    }
    let stdev = Some(DCGAN_INIT_STDEV);
    let nl = dcgan.nonlinearity;

    let mut net = encoder(p, dcgan, cfg)?;
    for (i, (c_in, c_out)) in [(8 * dim, 4 * dim), (4 * dim, 2 * dim), (2 * dim, dim)]
        .into_iter()
        .enumerate()
    {
        net = net.add(layers::deconv2d(p / format!("deconv{}", i + 2), c_in, c_out, 5, stdev));
        net = maybe_norm(net, p / format!("bn{}", i + 2), c_out, dcgan.normalize, cfg)?;
        net = net.add_fn(move |xs| nl.apply(xs));
    }
    let net = net
        .add(layers::deconv2d(p / "deconv5", dim, CHANNELS, 5, stdev))
        .add_fn(Tensor::tanh);

    Ok(SequentialGenerator {
        net,
        input_dim: cfg.input_dim(),
        device: p.device(),
    })
}

/// Baseline from the WGAN paper: constant width, no normalization.
pub fn crippled_dcgan(p: &nn::Path, cfg: &NetConfig) -> SequentialGenerator {
    let dim = cfg.dim;
    let mut net = nn::seq_t()
        .add(layers::linear(p / "input", cfg.input_dim(), 4 * 4 * dim, None))
        .add_fn(Tensor::relu)
        .add_fn(move |xs| xs.view([-1, dim, 4, 4]));
    for i in 2..5 {
        net = net
            .add(layers::deconv2d(p / format!("deconv{}", i), dim, dim, 5, None))
            .add_fn(Tensor::relu);
    }
    let net = net
        .add(layers::deconv2d(p / "deconv5", dim, CHANNELS, 5, None))
        .add_fn(Tensor::tanh);

    SequentialGenerator {
        net,
        input_dim: cfg.input_dim(),
        device: p.device(),
    }
}

/// Four relu layers of width 512 followed by a linear projection.
pub fn fully_connected(p: &nn::Path, cfg: &NetConfig) -> SequentialGenerator {
    let mut net = nn::seq_t();
    let mut n_in = cfg.input_dim();
    for i in 1..5 {
        net = net
            .add(layers::linear(p / format!("fc{}", i), n_in, FC_DIM, None))
            .add_fn(Tensor::relu);
        n_in = FC_DIM;
    }
    let net = net
        .add(layers::linear(p / "out", FC_DIM, OUTPUT_DIM, None))
        .add_fn(Tensor::tanh);

    SequentialGenerator {
        net,
        input_dim: cfg.input_dim(),
        device: p.device(),
    }
}

/// DCGAN-shaped decoder with gated activations; every gated stage is produced
/// with twice the channels it keeps.
pub fn multiplicative(
    p: &nn::Path,
    normalize: bool,
    cfg: &NetConfig,
) -> Result<SequentialGenerator, ConfigError> {
    let dim = cfg.dim;
    let mut net = nn::seq_t()
        .add(layers::linear(p / "input", cfg.input_dim(), 4 * 4 * 8 * dim * 2, None))
        .add_fn(move |xs| xs.view([-1, 8 * dim * 2, 4, 4]));
    net = maybe_norm(net, p / "bn1", 8 * dim * 2, normalize, cfg)?;
    net = net.add_fn(layers::gated);

    for (i, (c_in, c_out)) in [(8 * dim, 4 * dim), (4 * dim, 2 * dim), (2 * dim, dim)]
        .into_iter()
        .enumerate()
    {
        net = net.add(layers::deconv2d(p / format!("deconv{}", i + 2), c_in, c_out * 2, 5, None));
        net = maybe_norm(net, p / format!("bn{}", i + 2), c_out * 2, normalize, cfg)?;
        net = net.add_fn(layers::gated);
    }
    let net = net
        .add(layers::deconv2d(p / "deconv5", dim, CHANNELS, 5, None))
        .add_fn(Tensor::tanh);

    Ok(SequentialGenerator {
        net,
        input_dim: cfg.input_dim(),
        device: p.device(),
    })
}

/// 101-layer residual generator from 4x4 up to 64x64.
pub fn resnet(p: &nn::Path, cfg: &NetConfig) -> Result<SequentialGenerator, ConfigError> {
    let dim = cfg.dim;
    let mut net = nn::seq_t()
        .add(layers::linear(p / "input", cfg.input_dim(), 4 * 4 * 8 * dim, None))
        .add_fn(move |xs| xs.view([-1, 8 * dim, 4, 4]));

    let stages = [
        (4, 8 * dim, 6),
        (8, 4 * dim, 6),
        (16, 2 * dim, 6),
        (32, dim, 6),
        (64, dim / 2, 5),
    ];
    for (stage, &(size, channels, blocks)) in stages.iter().enumerate() {
        if stage > 0 {
            let c_in = stages[stage - 1].1;
            net = net.add(ResidualBlock::new(
                p / format!("up{}", stage),
                c_in,
                channels,
                3,
                Resample::Up,
                cfg,
                Role::Generator,
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
                Role::Generator,
            )?);
        }
    }
    let net = net
        .add(layers::conv2d(p / "out", dim / 2, CHANNELS, 1, 1, None, true))
        .add_fn(|xs| (xs / 5.).tanh());

    Ok(SequentialGenerator {
        net,
        input_dim: cfg.input_dim(),
        device: p.device(),
    })
}
