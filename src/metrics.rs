use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::loss::Costs;

type Series = BTreeMap<String, BTreeMap<u64, f64>>;

/// Per-iteration scalar accumulator. Values plotted since the last flush are
/// averaged when flushed; the whole history is rewritten to `log.json`.
#[derive(Debug)]
pub struct MetricsLog {
    path: PathBuf,
    iteration: u64,
    since_beginning: Series,
    since_last_flush: Series,
}

impl MetricsLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        MetricsLog {
            path: dir.as_ref().join("log.json"),
            iteration: 0,
            since_beginning: BTreeMap::new(),
            since_last_flush: BTreeMap::new(),
        }
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn plot(&mut self, name: &str, value: f64) {
        self.since_last_flush
            .entry(name.to_string())
            .or_default()
            .insert(self.iteration, value);
    }

    pub fn tick(&mut self) {
        self.iteration += 1;
    }

    /// Logs the per-name means since the last flush and persists all values.
    pub fn flush(&mut self) -> Result<BTreeMap<String, f64>> {
        let pending = std::mem::take(&mut self.since_last_flush);
        let mut means = BTreeMap::new();
        for (name, values) in pending {
            let mean = values.values().sum::<f64>() / values.len() as f64;
            means.insert(name.clone(), mean);
            self.since_beginning.entry(name).or_default().extend(values);
        }

        let line = means
            .iter()
            .map(|(name, mean)| format!("{name} {mean:.6}"))
            .collect::<Vec<_>>()
            .join("\t");
        info!("iter {}\t{}", self.iteration, line);

        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &self.since_beginning)?;
        Ok(means)
    }
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    iteration: u64,
    #[serde(flatten)]
    costs: &'a Costs,
}

/// Appends merged scalar snapshots to `scalars.jsonl`, one JSON object per line.
#[derive(Debug)]
pub struct SummaryWriter {
    path: PathBuf,
}

impl SummaryWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(SummaryWriter {
            path: dir.as_ref().join("scalars.jsonl"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_scalars(&self, iteration: u64, costs: &Costs) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let record = serde_json::to_string(&SummaryRecord { iteration, costs })?;
        writeln!(file, "{record}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_averages_pending_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new(dir.path());
        log.plot("train disc cost", 1.);
        log.tick();
        log.plot("train disc cost", 3.);
        log.plot("time", 0.5);
        log.tick();
        assert_eq!(log.iteration(), 2);
        let means = log.flush().unwrap();
        assert_eq!(means["train disc cost"], 2.);
        assert_eq!(means["time"], 0.5);

        // a second flush only sees what was plotted after the first
        log.plot("time", 1.5);
        let means = log.flush().unwrap();
        assert_eq!(means.len(), 1);
        assert_eq!(means["time"], 1.5);

        let saved: Series =
            serde_json::from_str(&fs::read_to_string(dir.path().join("log.json")).unwrap()).unwrap();
        assert_eq!(saved["train disc cost"].len(), 2);
        assert_eq!(saved["time"][&2], 1.5);
    }

    #[test]
    fn summary_lines_carry_every_tag() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(dir.path().join("summary")).unwrap();
        let costs = Costs {
            critic: 1.,
            generator_adversarial: 2.,
            generator_l1: 3.,
            generator: 4.,
        };
        writer.add_scalars(0, &costs).unwrap();
        writer.add_scalars(10, &costs).unwrap();

        let text = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["iteration"], 10);
        assert_eq!(lines[0]["gen l1 diff"], 3.);
        assert_eq!(lines[0]["disc loss"], 1.);
    }
}
