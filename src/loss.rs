use serde::Serialize;
use tch::{Kind, Reduction, Tensor};

use crate::downsample::Downsampler;
use crate::mode::Mode;
use crate::network::Discriminator;

/// Scalar costs of one step, kept for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Costs {
    #[serde(rename = "disc loss")]
    pub critic: f64,
    #[serde(rename = "gen gan loss")]
    pub generator_adversarial: f64,
    #[serde(rename = "gen l1 diff")]
    pub generator_l1: f64,
    #[serde(rename = "gen loss")]
    pub generator: f64,
}

/// Generator terms as graph tensors.
#[derive(Debug)]
pub struct GeneratorLoss {
    pub adversarial: Tensor,
    pub l1: Tensor,
    pub total: Tensor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossEngine {
    pub mode: Mode,
    pub gradient_penalty_lambda: f64,
    pub generator_l1_weight: f64,
}

impl LossEngine {
    pub fn new(mode: Mode, gradient_penalty_lambda: f64, generator_l1_weight: f64) -> Self {
        LossEngine {
            mode,
            gradient_penalty_lambda,
            generator_l1_weight,
        }
    }

    /// Critic objective from real and fake scores, without the gradient penalty.
    pub fn critic_from_scores(&self, real: &Tensor, fake: &Tensor) -> Tensor {
        match self.mode {
            Mode::Wgan | Mode::WganGp => real.mean(Kind::Float) - fake.mean(Kind::Float),
            Mode::Dcgan => (bce_with_logits(fake, 0.) + bce_with_logits(real, 1.)) / 2.,
            Mode::Lsgan => {
                ((real - 1.).square().mean(Kind::Float) + fake.square().mean(Kind::Float)) / 2.
            }
        }
    }

    pub fn generator_adversarial(&self, fake: &Tensor) -> Tensor {
        match self.mode {
            Mode::Wgan | Mode::WganGp => fake.mean(Kind::Float),
            Mode::Dcgan => bce_with_logits(fake, 1.),
            Mode::Lsgan => (fake - 1.).square().mean(Kind::Float),
        }
    }

    /// Full critic cost; `fake` is expected to carry no generator graph.
    pub fn critic_cost(
        &self,
        disc: &dyn Discriminator,
        real: &Tensor,
        fake: &Tensor,
        train: bool,
    ) -> Tensor {
        let real_scores = disc.score(real, train);
        let fake_scores = disc.score(fake, train);
        let cost = self.critic_from_scores(&real_scores, &fake_scores);
        self.with_penalty(cost, disc, real, fake, train)
    }

    /// Adds `lambda * gradient_penalty` to `cost` in wgan-gp mode.
    pub fn with_penalty(
        &self,
        cost: Tensor,
        disc: &dyn Discriminator,
        real: &Tensor,
        fake: &Tensor,
        train: bool,
    ) -> Tensor {
        if self.mode.uses_gradient_penalty() {
            cost + gradient_penalty(disc, real, fake, train) * self.gradient_penalty_lambda
        } else {
            cost
        }
    }

    pub fn generator_cost(
        &self,
        disc: &dyn Discriminator,
        downsampler: &Downsampler,
        fake: &Tensor,
        conditioning: &Tensor,
        train: bool,
    ) -> GeneratorLoss {
        let adversarial = self.generator_adversarial(&disc.score(fake, train));
        let l1 = l1_reconstruction(downsampler, fake, conditioning);
        let total = combine(&l1, &adversarial, self.generator_l1_weight);
        GeneratorLoss {
            adversarial,
            l1,
            total,
        }
    }
}

fn bce_with_logits(logits: &Tensor, target: f64) -> Tensor {
    let targets = logits.full_like(target);
    logits.binary_cross_entropy_with_logits::<Tensor>(&targets, None, None, Reduction::Mean)
}

/// `mean((|grad D(x_hat)|_2 - 1)^2)` along random per-example interpolations
/// between real and fake images.
pub fn gradient_penalty(
    disc: &dyn Discriminator,
    real: &Tensor,
    fake: &Tensor,
    train: bool,
) -> Tensor {
    let n = real.size()[0];
    let alpha = Tensor::rand([n, 1], (Kind::Float, real.device()));
    let interpolates = (real + &alpha * (fake - real))
        .detach()
        .set_requires_grad(true);
    let scores = disc.score(&interpolates, train);
    let gradients = Tensor::run_backward(&[scores.sum(Kind::Float)], &[&interpolates], true, true);
    let slopes = gradients[0]
        .square()
        .sum_dim_intlist(&[1i64][..], false, Kind::Float)
        .sqrt();
    (slopes - 1.).square().mean(Kind::Float)
}

/// Mean absolute difference between the downsampled fake and the conditioning input.
pub fn l1_reconstruction(downsampler: &Downsampler, fake: &Tensor, conditioning: &Tensor) -> Tensor {
    (downsampler.downsample(fake) - conditioning)
        .abs()
        .mean(Kind::Float)
}

pub fn combine(l1: &Tensor, adversarial: &Tensor, l1_weight: f64) -> Tensor {
    l1 * l1_weight + adversarial * (1. - l1_weight)
}
