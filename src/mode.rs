use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::nn::{self, OptimizerConfig};

use crate::error::ConfigError;

/// Number of critic updates per generator update in the Wasserstein modes.
pub const CRITIC_ITERS: usize = 5;

/// Bound applied to every critic parameter after a `wgan` critic step.
pub const CLIP_BOUND: f64 = 0.01;

/// Adversarial objective, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "wgan")]
    Wgan,
    #[serde(rename = "wgan-gp")]
    WganGp,
    #[serde(rename = "dcgan")]
    Dcgan,
    #[serde(rename = "lsgan")]
    Lsgan,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Wgan, Mode::WganGp, Mode::Dcgan, Mode::Lsgan];

    pub fn critic_iters(self) -> usize {
        match self {
            Mode::Wgan | Mode::WganGp => CRITIC_ITERS,
            Mode::Dcgan | Mode::Lsgan => 1,
        }
    }

    /// Only the original WGAN enforces the Lipschitz constraint by clipping.
    pub fn clips_critic_weights(self) -> bool {
        matches!(self, Mode::Wgan)
    }

    pub fn uses_gradient_penalty(self) -> bool {
        matches!(self, Mode::WganGp)
    }

    /// Discriminators must not mix statistics across examples under a
    /// per-example gradient penalty.
    pub fn per_example_critic_norm(self) -> bool {
        matches!(self, Mode::WganGp)
    }

    pub fn optimizer(self) -> OptimizerSpec {
        match self {
            Mode::Wgan | Mode::Lsgan => OptimizerSpec {
                kind: OptimizerKind::RmsProp,
                learning_rate: 1e-4,
            },
            Mode::WganGp => OptimizerSpec {
                kind: OptimizerKind::Adam {
                    beta1: 0.5,
                    beta2: 0.9,
                },
                learning_rate: 1e-4,
            },
            Mode::Dcgan => OptimizerSpec {
                kind: OptimizerKind::Adam {
                    beta1: 0.5,
                    beta2: 0.999,
                },
                learning_rate: 2e-4,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Wgan => "wgan",
            Mode::WganGp => "wgan-gp",
            Mode::Dcgan => "dcgan",
            Mode::Lsgan => "lsgan",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wgan" => Ok(Mode::Wgan),
            "wgan-gp" => Ok(Mode::WganGp),
            "dcgan" => Ok(Mode::Dcgan),
            "lsgan" => Ok(Mode::Lsgan),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerKind {
    Adam { beta1: f64, beta2: f64 },
    RmsProp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSpec {
    pub kind: OptimizerKind,
    pub learning_rate: f64,
}

impl OptimizerSpec {
    /// Builds an optimizer over exactly the variables of `vs`.
    pub fn build(&self, vs: &nn::VarStore) -> Result<nn::Optimizer, tch::TchError> {
        match self.kind {
            OptimizerKind::Adam { beta1, beta2 } => {
                nn::adam(beta1, beta2, 0.).build(vs, self.learning_rate)
            }
            // decay 0.9 and epsilon 1e-10 follow the TensorFlow RMSProp defaults
            OptimizerKind::RmsProp => nn::RmsProp {
                alpha: 0.9,
                eps: 1e-10,
                wd: 0.,
                momentum: 0.,
                centered: false,
            }
            .build(vs, self.learning_rate),
        }
    }
}
