//! Alternating critic / generator training.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;
use tch::{nn, Device, Kind, Tensor};

use crate::architecture;
use crate::config::TrainConfig;
use crate::data;
use crate::downsample::Downsampler;
use crate::error::{GanError, Result};
use crate::export::ImageExporter;
use crate::loss::{Costs, LossEngine};
use crate::metrics::{MetricsLog, SummaryWriter};
use crate::mode::CLIP_BOUND;
use crate::network::{Discriminator, Generator};

/// Iterations between merged summary snapshots.
const SUMMARY_EVERY: u64 = 10;
/// Period of image export and late metric flushes.
const EXPORT_EVERY: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    MaxIterations,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingReport {
    pub iterations: u64,
    pub critic_steps: u64,
    pub generator_steps: u64,
    pub clip_steps: u64,
    pub termination: Termination,
}

pub struct Trainer {
    config: TrainConfig,
    device: Device,
    engine: LossEngine,
    downsampler: Downsampler,
    gen_vs: nn::VarStore,
    disc_vs: nn::VarStore,
    generator: Box<dyn Generator>,
    discriminator: Box<dyn Discriminator>,
    gen_opt: nn::Optimizer,
    disc_opt: nn::Optimizer,
}

impl Trainer {
    /// Validates the configuration and builds both networks with their
    /// optimizers. Touches no files.
    pub fn new(config: TrainConfig, device: Device) -> Result<Self> {
        config.validate()?;
        if let Some(seed) = config.seed {
            tch::manual_seed(seed as i64);
        }

        let (gen_kind, disc_kind) = architecture::select(config.architecture_index)?;
        let net = config.net_config();
        let gen_vs = nn::VarStore::new(device);
        let disc_vs = nn::VarStore::new(device);
        let generator = gen_kind.build(&(gen_vs.root() / "generator"), &net)?;
        let discriminator = disc_kind.build(&(disc_vs.root() / "discriminator"), &net)?;

        let optimizer = config.mode.optimizer();
        let gen_opt = optimizer.build(&gen_vs)?;
        let disc_opt = optimizer.build(&disc_vs)?;

        let downsampler =
            Downsampler::new(config.downsample_factor, config.downsample_method, device)?;
        let engine = LossEngine::new(
            config.mode,
            config.gradient_penalty_lambda,
            config.generator_l1_weight,
        );

        info!(
            "mode {} architecture {:?}/{:?}, critic iters {}, optimizer {:?}",
            config.mode,
            gen_kind,
            disc_kind,
            config.mode.critic_iters(),
            optimizer
        );

        Ok(Trainer {
            config,
            device,
            engine,
            downsampler,
            gen_vs,
            disc_vs,
            generator,
            discriminator,
            gen_opt,
            disc_opt,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn generator_vars(&self) -> &nn::VarStore {
        &self.gen_vs
    }

    pub fn discriminator_vars(&self) -> &nn::VarStore {
        &self.disc_vs
    }

    /// Normalizes a raw batch and splits it into towers of (real, conditioning).
    fn towers(&self, batch: &Tensor) -> Vec<(Tensor, Tensor)> {
        let real = data::normalize(&batch.to_device(self.device));
        real.chunk(self.config.towers, 0)
            .into_iter()
            .map(|real| {
                let conditioning = self.downsampler.downsample(&real);
                (real, conditioning)
            })
            .collect()
    }

    fn critic_cost(&self, real: &Tensor, conditioning: &Tensor) -> Tensor {
        let n = real.size()[0];
        let fake = tch::no_grad(|| self.generator.generate(n, Some(conditioning), true));
        self.engine
            .critic_cost(self.discriminator.as_ref(), real, &fake, true)
    }

    /// One critic update. Returns the critic cost before the update.
    pub fn critic_step(&mut self, batch: &Tensor) -> f64 {
        self.gen_vs.freeze();
        let costs: Vec<Tensor> = self
            .towers(batch)
            .iter()
            .map(|(real, conditioning)| self.critic_cost(real, conditioning))
            .collect();
        let cost = tower_mean(&costs);
        self.disc_opt.backward_step(&cost);
        self.gen_vs.unfreeze();
        cost.double_value(&[])
    }

    /// One generator update. Returns the combined generator cost before the update.
    pub fn generator_step(&mut self, batch: &Tensor) -> f64 {
        self.disc_vs.freeze();
        let costs: Vec<Tensor> = self
            .towers(batch)
            .iter()
            .map(|(real, conditioning)| {
                let n = real.size()[0];
                let fake = self.generator.generate(n, Some(conditioning), true);
                self.engine
                    .generator_cost(
                        self.discriminator.as_ref(),
                        &self.downsampler,
                        &fake,
                        conditioning,
                        true,
                    )
                    .total
            })
            .collect();
        let cost = tower_mean(&costs);
        self.gen_opt.backward_step(&cost);
        self.disc_vs.unfreeze();
        cost.double_value(&[])
    }

    /// Clamps every trainable critic parameter to `[-CLIP_BOUND, CLIP_BOUND]`.
    pub fn clip_critic_weights(&mut self) {
        tch::no_grad(|| {
            for mut var in self.disc_vs.trainable_variables() {
                let _ = var.clamp_(-CLIP_BOUND, CLIP_BOUND);
            }
        });
    }

    /// All four costs on `batch`, averaged over towers. Forward passes run
    /// without gradient tracking; only the gradient penalty needs a graph.
    pub fn costs(&self, batch: &Tensor) -> Costs {
        let disc = self.discriminator.as_ref();
        let mut critic = Vec::new();
        let mut adversarial = Vec::new();
        let mut l1 = Vec::new();
        let mut total = Vec::new();
        for (real, conditioning) in self.towers(batch) {
            let (fake, cost, gen) = tch::no_grad(|| {
                let n = real.size()[0];
                let fake = self.generator.generate(n, Some(&conditioning), true);
                let cost = self
                    .engine
                    .critic_from_scores(&disc.score(&real, true), &disc.score(&fake, true));
                let gen = self
                    .engine
                    .generator_cost(disc, &self.downsampler, &fake, &conditioning, true);
                (fake, cost, gen)
            });
            let cost = self.engine.with_penalty(cost, disc, &real, &fake, true);
            critic.push(cost.detach());
            adversarial.push(gen.adversarial);
            l1.push(gen.l1);
            total.push(gen.total);
        }
        Costs {
            critic: tower_mean(&critic).double_value(&[]),
            generator_adversarial: tower_mean(&adversarial).double_value(&[]),
            generator_l1: tower_mean(&l1).double_value(&[]),
            generator: tower_mean(&total).double_value(&[]),
        }
    }

    fn export(&self, iteration: u64, fixed: &Tensor, exporter: &ImageExporter) -> Result<()> {
        let real = data::normalize(&fixed.to_device(self.device));
        let conditioning = self.downsampler.downsample(&real);
        let fake = tch::no_grad(|| {
            self.generator
                .generate(real.size()[0], Some(&conditioning), true)
        });
        exporter.save_comparison(
            iteration,
            &conditioning.to_device(Device::Cpu),
            &fake.to_device(Device::Cpu),
            &real.to_device(Device::Cpu),
            self.downsampler.output_size(),
        )?;
        Ok(())
    }

    /// Runs the loop until `max_iterations` or the wall-clock budget,
    /// whichever comes first. The budget is checked before each iteration.
    pub fn train<I>(&mut self, batches: &mut I) -> Result<TrainingReport>
    where
        I: Iterator<Item = Tensor>,
    {
        let max_runtime = self.config.max_runtime()?;
        prepare_output_dirs(&self.config)?;
        save_config(&self.config, &self.config.train_dir.join("config.json"))?;

        let exporter = ImageExporter::new(&self.config.train_dir);
        let summary = SummaryWriter::new(&self.config.summary_dir)?;
        let mut metrics = MetricsLog::new(&self.config.train_dir);

        // first batch doubles as the ground truth sample and the visualization batch
        let fixed = batches.next().ok_or(GanError::StreamEnded)?;
        let path = exporter.save_ground_truth(&data::normalize(&fixed))?;
        info!("saved ground truth to {:?}", path);

        let critic_iters = self.config.mode.critic_iters();
        let clips = self.config.mode.clips_critic_weights();

        let mut report = TrainingReport {
            iterations: 0,
            critic_steps: 0,
            generator_steps: 0,
            clip_steps: 0,
            termination: Termination::MaxIterations,
        };
        let mut last_batch: Option<Tensor> = None;
        let all_start = Instant::now();

        for iteration in 0..self.config.max_iterations {
            let start = Instant::now();
            if all_start.elapsed() > max_runtime {
                info!("runtime budget exhausted at iteration {}", iteration);
                report.termination = Termination::Runtime;
                break;
            }

            if let Some(batch) = &last_batch {
                self.generator_step(batch);
                report.generator_steps += 1;
            }

            let mut critic_cost = 0.;
            for _ in 0..critic_iters {
                let batch = batches.next().ok_or(GanError::StreamEnded)?;
                critic_cost = self.critic_step(&batch);
                report.critic_steps += 1;
                if clips {
                    self.clip_critic_weights();
                    report.clip_steps += 1;
                }
                last_batch = Some(batch);
            }

            metrics.plot("train disc cost", critic_cost);
            metrics.plot("time", start.elapsed().as_secs_f64());

            if iteration % SUMMARY_EVERY == 0 {
                if let Some(batch) = &last_batch {
                    let costs = self.costs(batch);
                    debug!("iter {} {:?}", iteration, costs);
                    summary.add_scalars(iteration, &costs)?;
                }
            }

            if iteration % EXPORT_EVERY == 9 {
                self.export(iteration, &fixed, &exporter)?;
            }

            if iteration < 5 || iteration % EXPORT_EVERY == EXPORT_EVERY - 1 {
                metrics.flush()?;
            }

            metrics.tick();
            report.iterations += 1;
        }

        info!("training finished: {:?}", report);
        Ok(report)
    }
}

fn tower_mean(costs: &[Tensor]) -> Tensor {
    Tensor::stack(costs, 0).mean(Kind::Float)
}

/// Creates the summary directory and a fresh training directory.
pub fn prepare_output_dirs(config: &TrainConfig) -> Result<()> {
    fs::create_dir_all(&config.summary_dir)?;
    if config.clean_train_dir && config.train_dir.exists() {
        fs::remove_dir_all(&config.train_dir)?;
    }
    fs::create_dir_all(&config.train_dir)?;
    Ok(())
}

fn save_config(config: &TrainConfig, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, config)?;
    Ok(())
}
