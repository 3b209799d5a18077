use std::path::PathBuf;

use clap::Parser;
use srgan::downsample::DownsampleMethod;
use srgan::{Mode, TrainConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Loss function: wgan-gp, dcgan, wgan or lsgan.
    #[arg(long, default_value = "wgan-gp")]
    pub mode: Mode,

    /// Directory holding the training images.
    #[arg(long, default_value = "data/celebA_64x64")]
    pub data_dir: PathBuf,

    /// Image and metrics output directory. Recreated at startup.
    #[arg(long, default_value = "train")]
    pub train_dir: PathBuf,

    /// Scalar summary directory.
    #[arg(long, default_value = "summary")]
    pub summary_dir: PathBuf,

    /// Maximum run time in minutes.
    #[arg(long, default_value = "20")]
    pub max_runtime: f64,

    /// Maximum number of iterations.
    #[arg(long, default_value = "500")]
    pub max_iter: u64,

    /// Gradient penalty weight (wgan-gp only).
    #[arg(long = "lambda", default_value = "10")]
    pub gradient_penalty_lambda: f64,

    /// Weight of the L1 reconstruction term in the generator loss.
    #[arg(long, default_value = "0.9")]
    pub gen_l1_weight: f64,

    /// Index of the generator/discriminator pair, 0 to 6.
    #[arg(long, default_value = "0")]
    pub architecture: usize,

    /// Mini-batch size. Must be a multiple of --towers.
    #[arg(long, default_value = "16")]
    pub batch_size: i64,

    /// Base channel width of both networks.
    #[arg(long, default_value = "64")]
    pub dim: i64,

    /// Downsampling method for the conditioning input: conv or area.
    #[arg(long, default_value = "conv")]
    pub downsample: DownsampleMethod,

    /// Number of equal batch splits whose losses are averaged.
    #[arg(long, default_value = "1")]
    pub towers: i64,

    /// Seed for weight initialization and data shuffling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the existing contents of the training directory.
    #[arg(long)]
    pub keep_train_dir: bool,
}

impl From<Args> for TrainConfig {
    fn from(args: Args) -> Self {
        TrainConfig {
            mode: args.mode,
            data_dir: args.data_dir,
            train_dir: args.train_dir,
            summary_dir: args.summary_dir,
            max_runtime_minutes: args.max_runtime,
            max_iterations: args.max_iter,
            gradient_penalty_lambda: args.gradient_penalty_lambda,
            generator_l1_weight: args.gen_l1_weight,
            architecture_index: args.architecture,
            batch_size: args.batch_size,
            dim: args.dim,
            downsample_method: args.downsample,
            towers: args.towers,
            seed: args.seed,
            clean_train_dir: !args.keep_train_dir,
            ..TrainConfig::default()
        }
    }
}
