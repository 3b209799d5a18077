use std::str::FromStr;

use tch::{nn, Tensor};

use crate::error::ConfigError;
use crate::layers;
use crate::network::NetConfig;
use crate::norm::{Normalization, Role, BATCH_AXES};

/// Scale applied to the residual branch before it joins the shortcut.
pub const RESIDUAL_SCALE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    None,
    Down,
    Up,
}

impl FromStr for Resample {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Resample::None),
            "down" => Ok(Resample::Down),
            "up" => Ok(Resample::Up),
            other => Err(ConfigError::InvalidResample(other.to_string())),
        }
    }
}

#[derive(Debug)]
enum Shortcut {
    Identity,
    Conv(nn::Conv2D),
    // 1x1 conv to 4x channels followed by depth-to-space
    Subpixel(nn::Conv2D),
}

#[derive(Debug)]
enum Middle {
    Conv(nn::Conv2D),
    Deconv(nn::ConvTranspose2D),
}

/// Pre-activation bottleneck block: `shortcut(x) + 0.3 * main(x)`.
#[derive(Debug)]
pub struct ResidualBlock {
    shortcut: Shortcut,
    conv1: nn::Conv2D,
    conv1b: Middle,
    conv2: nn::Conv2D,
    norm: Normalization,
}

impl ResidualBlock {
    pub fn new(
        p: nn::Path,
        input_dim: i64,
        output_dim: i64,
        ksize: i64,
        resample: Resample,
        cfg: &NetConfig,
        role: Role,
    ) -> Result<Self, ConfigError> {
        let shortcut = match resample {
            Resample::None if input_dim == output_dim => Shortcut::Identity,
            Resample::None => Shortcut::Conv(layers::conv2d(
                &p / "shortcut",
                input_dim,
                output_dim,
                1,
                1,
                None,
                true,
            )),
            Resample::Down => Shortcut::Conv(layers::conv2d(
                &p / "shortcut",
                input_dim,
                output_dim,
                1,
                2,
                None,
                true,
            )),
            Resample::Up => Shortcut::Subpixel(layers::conv2d(
                &p / "shortcut",
                input_dim,
                4 * output_dim,
                1,
                1,
                None,
                true,
            )),
        };

        let conv1 = layers::conv2d(&p / "conv1", input_dim, input_dim / 2, 1, 1, None, true);
        let conv1b = match resample {
            Resample::None => Middle::Conv(layers::conv2d(
                &p / "conv1b",
                input_dim / 2,
                output_dim / 2,
                ksize,
                1,
                None,
                true,
            )),
            Resample::Down => Middle::Conv(layers::conv2d(
                &p / "conv1b",
                input_dim / 2,
                output_dim / 2,
                ksize,
                2,
                None,
                true,
            )),
            Resample::Up => Middle::Deconv(layers::deconv2d(
                &p / "conv1b",
                input_dim / 2,
                output_dim / 2,
                ksize,
                None,
            )),
        };
        let conv2 = layers::conv2d(&p / "conv2", output_dim / 2, output_dim, 1, 1, None, false);
        let norm = Normalization::new(&p / "bn", output_dim, &BATCH_AXES, role, cfg.mode)?;

        Ok(ResidualBlock {
            shortcut,
            conv1,
            conv1b,
            conv2,
            norm,
        })
    }
}

impl nn::ModuleT for ResidualBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let shortcut = match &self.shortcut {
            Shortcut::Identity => xs.shallow_clone(),
            Shortcut::Conv(conv) => xs.apply(conv),
            Shortcut::Subpixel(conv) => xs.apply(conv).pixel_shuffle(2),
        };

        let ys = xs.relu().apply(&self.conv1).relu();
        let ys = match &self.conv1b {
            Middle::Conv(conv) => ys.apply(conv),
            Middle::Deconv(deconv) => ys.apply(deconv),
        };
        let ys = ys.relu().apply(&self.conv2);
        let ys = ys.apply_t(&self.norm, train);

        shortcut + ys * RESIDUAL_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use tch::{Device, Kind};

    fn block(vs: &nn::VarStore, c_in: i64, c_out: i64, resample: Resample) -> ResidualBlock {
        let cfg = NetConfig::new(Mode::Lsgan).with_dim(8);
        let name = format!("block_{:?}", resample);
        ResidualBlock::new(vs.root() / name, c_in, c_out, 3, resample, &cfg, Role::Generator)
            .unwrap()
    }

    #[test]
    fn resample_modes_change_resolution() {
        let vs = nn::VarStore::new(Device::Cpu);
        let xs = Tensor::randn([2, 8, 8, 8], (Kind::Float, Device::Cpu));
        assert_eq!(
            xs.apply_t(&block(&vs, 8, 8, Resample::None), true).size(),
            vec![2, 8, 8, 8]
        );
        assert_eq!(
            xs.apply_t(&block(&vs, 8, 16, Resample::Down), true).size(),
            vec![2, 16, 4, 4]
        );
        assert_eq!(
            xs.apply_t(&block(&vs, 8, 4, Resample::Up), true).size(),
            vec![2, 4, 16, 16]
        );
    }

    #[test]
    fn unknown_resample_is_rejected() {
        assert_eq!("up".parse::<Resample>().unwrap(), Resample::Up);
        assert!(matches!(
            "sideways".parse::<Resample>(),
            Err(ConfigError::InvalidResample(s)) if s == "sideways"
        ));
    }
}
