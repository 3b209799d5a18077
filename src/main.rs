use clap::Parser;
use log::info;
use srgan::data::BatchStream;
use srgan::{GanError, TrainConfig, Trainer};
use tch::Device;

mod cli;
use cli::Args;

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), GanError> {
    env_logger::init();

    let config = TrainConfig::from(Args::parse());
    config.validate()?;

    let device = Device::cuda_if_available();
    info!("Using device: {:?}", device);
    info!("Settings: {}", serde_json::to_string(&config)?);

    let mut trainer = Trainer::new(config, device)?;
    let cfg = trainer.config();
    let mut batches = BatchStream::from_dir(&cfg.data_dir, cfg.batch_size, cfg.seed)?;
    let report = trainer.train(&mut batches)?;

    info!(
        "{} iterations, {} critic steps, {} generator steps, stopped by {:?}",
        report.iterations, report.critic_steps, report.generator_steps, report.termination
    );
    Ok(())
}
