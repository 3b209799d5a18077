// Thin wrappers over the tch layer constructors shared by every network.

use tch::{nn, Tensor};

/// Standard deviation used by the DCGAN-family constructors.
pub const DCGAN_INIT_STDEV: f64 = 0.02;

fn weight_init(stdev: Option<f64>) -> nn::Init {
    match stdev {
        Some(stdev) => nn::Init::Randn { mean: 0., stdev },
        None => nn::init::DEFAULT_KAIMING_UNIFORM,
    }
}

/// Convolution with "same" padding for odd kernels, so stride 2 halves the
/// spatial size exactly.
pub fn conv2d(
    p: nn::Path,
    c_in: i64,
    c_out: i64,
    ksize: i64,
    stride: i64,
    stdev: Option<f64>,
    bias: bool,
) -> nn::Conv2D {
    let cfg = nn::ConvConfig {
        stride,
        padding: ksize / 2,
        bias,
        ws_init: weight_init(stdev),
        ..Default::default()
    };
    nn::conv2d(p, c_in, c_out, ksize, cfg)
}

/// Stride-2 transposed convolution doubling the spatial size.
pub fn deconv2d(p: nn::Path, c_in: i64, c_out: i64, ksize: i64, stdev: Option<f64>) -> nn::ConvTranspose2D {
    let cfg = nn::ConvTransposeConfig {
        stride: 2,
        padding: ksize / 2,
        output_padding: 1,
        ws_init: weight_init(stdev),
        ..Default::default()
    };
    nn::conv_transpose2d(p, c_in, c_out, ksize, cfg)
}

pub fn linear(p: nn::Path, n_in: i64, n_out: i64, stdev: Option<f64>) -> nn::Linear {
    let cfg = nn::LinearConfig {
        ws_init: weight_init(stdev),
        ..Default::default()
    };
    nn::linear(p, n_in, n_out, cfg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nonlinearity {
    Relu,
    LeakyRelu,
    Tanh,
}

impl Nonlinearity {
    pub fn apply(self, xs: &Tensor) -> Tensor {
        match self {
            Nonlinearity::Relu => xs.relu(),
            Nonlinearity::LeakyRelu => leaky_relu(xs),
            Nonlinearity::Tanh => xs.tanh(),
        }
    }
}

pub fn leaky_relu(xs: &Tensor) -> Tensor {
    xs.maximum(&(xs * 0.2))
}

/// PixelCNN-style gate: `sigmoid(a) * tanh(b)` over the even and odd channels.
/// Halves the channel count.
pub fn gated(xs: &Tensor) -> Tensor {
    let a = xs.slice(1, 0, None::<i64>, 2);
    let b = xs.slice(1, 1, None::<i64>, 2);
    a.sigmoid() * b.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn conv_and_deconv_resize_by_two() {
        let vs = nn::VarStore::new(Device::Cpu);
        let conv = conv2d(vs.root() / "conv", 3, 4, 5, 2, Some(DCGAN_INIT_STDEV), true);
        let deconv = deconv2d(vs.root() / "deconv", 4, 3, 5, None);
        let xs = Tensor::randn([2, 3, 16, 16], (Kind::Float, Device::Cpu));
        let down = xs.apply(&conv);
        assert_eq!(down.size(), vec![2, 4, 8, 8]);
        assert_eq!(down.apply(&deconv).size(), vec![2, 3, 16, 16]);
    }

    #[test]
    fn gate_halves_channels() {
        let xs = Tensor::zeros([1, 4, 2, 2], (Kind::Float, Device::Cpu));
        let ys = gated(&xs);
        assert_eq!(ys.size(), vec![1, 2, 2, 2]);
        // sigmoid(0) * tanh(0)
        assert_eq!(ys.abs().max().double_value(&[]), 0.);
    }
}
