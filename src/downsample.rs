use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

use crate::error::ConfigError;
use crate::network::{CHANNELS, IMAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsampleMethod {
    /// Depthwise box filter with stride equal to the factor.
    Conv,
    /// Area interpolation.
    Area,
}

impl fmt::Display for DownsampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownsampleMethod::Conv => f.write_str("conv"),
            DownsampleMethod::Area => f.write_str("area"),
        }
    }
}

impl FromStr for DownsampleMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conv" => Ok(DownsampleMethod::Conv),
            "area" => Ok(DownsampleMethod::Area),
            other => Err(ConfigError::UnknownDownsampleMethod(other.to_string())),
        }
    }
}

/// Fixed, non-trainable decimation by averaging. The same instance produces
/// the generator's conditioning input and the reconstruction target.
#[derive(Debug)]
pub struct Downsampler {
    factor: i64,
    method: DownsampleMethod,
    kernel: Tensor,
}

impl Downsampler {
    pub fn new(factor: i64, method: DownsampleMethod, device: Device) -> Result<Self, ConfigError> {
        if factor <= 0 || IMAGE_SIZE % factor != 0 {
            return Err(ConfigError::InvalidDownsampleFactor(factor));
        }

        // one k x k filter per channel, no cross-channel mixing
        let weight = 1.0 / (factor * factor) as f64;
        let kernel = Tensor::full([CHANNELS, 1, factor, factor], weight, (Kind::Float, device));

        Ok(Downsampler {
            factor,
            method,
            kernel,
        })
    }

    pub fn factor(&self) -> i64 {
        self.factor
    }

    pub fn method(&self) -> DownsampleMethod {
        self.method
    }

    /// Side length of the downsampled images.
    pub fn output_size(&self) -> i64 {
        IMAGE_SIZE / self.factor
    }

    /// `[n, 3*64*64]` images to `[n, 3*(64/k)*(64/k)]` conditioning vectors.
    pub fn downsample(&self, images: &Tensor) -> Tensor {
        let size = self.output_size();
        let xs = images.view([-1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);
        let ys = match self.method {
            DownsampleMethod::Conv => xs.conv2d(
                &self.kernel,
                None::<Tensor>,
                [self.factor, self.factor],
                [0, 0],
                [1, 1],
                CHANNELS,
            ),
            DownsampleMethod::Area => xs.adaptive_avg_pool2d([size, size]),
        };
        ys.view([-1, CHANNELS * size * size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_factor_not_dividing_image_size() {
        assert!(matches!(
            Downsampler::new(3, DownsampleMethod::Conv, Device::Cpu),
            Err(ConfigError::InvalidDownsampleFactor(3))
        ));
    }

    #[test]
    fn channels_are_averaged_independently() {
        let ds = Downsampler::new(4, DownsampleMethod::Conv, Device::Cpu).unwrap();
        let red = Tensor::ones([1, 1, 64, 64], (Kind::Float, Device::Cpu));
        let rest = Tensor::zeros([1, 2, 64, 64], (Kind::Float, Device::Cpu));
        let image = Tensor::cat(&[red, rest], 1).view([1, -1]);
        let out = ds.downsample(&image).view([1, 3, 16, 16]);
        assert!((out.get(0).get(0).mean(Kind::Float).double_value(&[]) - 1.).abs() < 1e-6);
        assert_eq!(out.narrow(1, 1, 2).abs().max().double_value(&[]), 0.);
    }

    #[test]
    fn method_names_round_trip() {
        for method in [DownsampleMethod::Conv, DownsampleMethod::Area] {
            assert_eq!(method.to_string().parse::<DownsampleMethod>().unwrap(), method);
            let ds = Downsampler::new(2, method, Device::Cpu).unwrap();
            assert_eq!((ds.factor(), ds.method(), ds.output_size()), (2, method, 32));
        }
        assert!("bicubic".parse::<DownsampleMethod>().is_err());
    }
}
