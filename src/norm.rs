use tch::{nn, Kind, Tensor};

use crate::error::ConfigError;
use crate::mode::Mode;

/// The only reduction axes the networks normalize over (batch, height, width).
pub const BATCH_AXES: [i64; 3] = [0, 2, 3];

const EPS: f64 = 1e-5;

/// Which network a layer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Generator,
    Discriminator,
}

/// Batch normalization, or a per-example layer normalization over
/// (channels, height, width) with per-channel affine parameters.
#[derive(Debug)]
pub enum Normalization {
    Batch(nn::BatchNorm),
    PerExample { gamma: Tensor, beta: Tensor },
}

impl Normalization {
    pub fn new(
        p: nn::Path,
        channels: i64,
        axes: &[i64],
        role: Role,
        mode: Mode,
    ) -> Result<Self, ConfigError> {
        if role == Role::Discriminator && mode.per_example_critic_norm() {
            if axes != BATCH_AXES.as_slice() {
                return Err(ConfigError::UnsupportedNormAxes(axes.to_vec()));
            }
            let gamma = p.ones("gamma", &[channels]);
            let beta = p.zeros("beta", &[channels]);
            return Ok(Normalization::PerExample { gamma, beta });
        }
        Ok(Normalization::Batch(nn::batch_norm2d(
            p,
            channels,
            Default::default(),
        )))
    }

    pub fn is_per_example(&self) -> bool {
        matches!(self, Normalization::PerExample { .. })
    }
}

impl nn::ModuleT for Normalization {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self {
            Normalization::Batch(bn) => xs.apply_t(bn, train),
            Normalization::PerExample { gamma, beta } => {
                let mean = xs.mean_dim(&[1i64, 2, 3][..], true, Kind::Float);
                let centered = xs - &mean;
                let var = centered.square().mean_dim(&[1i64, 2, 3][..], true, Kind::Float);
                let normed = centered / (var + EPS).sqrt();
                normed * gamma.view([1, -1, 1, 1]) + beta.view([1, -1, 1, 1])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn critic_uses_per_example_norm_only_under_gradient_penalty() {
        let vs = nn::VarStore::new(Device::Cpu);
        for mode in Mode::ALL {
            let norm = Normalization::new(
                vs.root() / mode.as_str(),
                4,
                &BATCH_AXES,
                Role::Discriminator,
                mode,
            )
            .unwrap();
            assert_eq!(norm.is_per_example(), mode == Mode::WganGp);

            let gen_norm = Normalization::new(
                vs.root() / "gen" / mode.as_str(),
                4,
                &BATCH_AXES,
                Role::Generator,
                mode,
            )
            .unwrap();
            assert!(!gen_norm.is_per_example());
        }
    }

    #[test]
    fn rejects_non_standard_axes() {
        let vs = nn::VarStore::new(Device::Cpu);
        let err = Normalization::new(vs.root(), 4, &[0, 1], Role::Discriminator, Mode::WganGp)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedNormAxes(axes) if axes == vec![0, 1]));
    }

    #[test]
    fn per_example_output_does_not_depend_on_batch_mates() {
        let vs = nn::VarStore::new(Device::Cpu);
        let norm =
            Normalization::new(vs.root(), 2, &BATCH_AXES, Role::Discriminator, Mode::WganGp)
                .unwrap();
        let a = Tensor::randn([1, 2, 4, 4], (Kind::Float, Device::Cpu));
        let b = Tensor::randn([1, 2, 4, 4], (Kind::Float, Device::Cpu)) * 10.;
        let alone = a.apply_t(&norm, true);
        let together = Tensor::cat(&[&a, &b], 0).apply_t(&norm, true).narrow(0, 0, 1);
        let diff = (alone - together).abs().max().double_value(&[]);
        assert!(diff < 1e-5);
    }
}
