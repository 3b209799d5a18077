use std::path::{Path, PathBuf};

use log::info;
use tch::{Kind, Tensor};

use crate::error::Result;
use crate::network::{CHANNELS, IMAGE_SIZE};

/// Rows of the comparison panel.
pub const MAX_SAMPLES: i64 = 10;

/// Writes the periodic qualitative images into the training directory.
#[derive(Debug, Clone)]
pub struct ImageExporter {
    dir: PathBuf,
    max_samples: i64,
}

impl ImageExporter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ImageExporter {
            dir: dir.as_ref().to_path_buf(),
            max_samples: MAX_SAMPLES,
        }
    }

    pub fn image_path(&self, iteration: u64) -> PathBuf {
        self.dir.join(format!("batch{:06}_image.png", iteration))
    }

    pub fn row_path(&self, iteration: u64) -> PathBuf {
        self.dir.join(format!("batch{:06}_row.png", iteration))
    }

    pub fn ground_truth_path(&self) -> PathBuf {
        self.dir.join("samples_groundtruth.png")
    }

    /// Saves the nearest / bicubic / generated / ground-truth panel and the
    /// strip of generated samples. All inputs are flattened images in [-1, 1].
    pub fn save_comparison(
        &self,
        iteration: u64,
        conditioning: &Tensor,
        fake: &Tensor,
        real: &Tensor,
        cond_size: i64,
    ) -> Result<(PathBuf, PathBuf)> {
        let (panel, row) = comparison_panel(conditioning, fake, real, cond_size, self.max_samples);
        let image_path = self.image_path(iteration);
        let row_path = self.row_path(iteration);
        tch::vision::image::save(&quantize(&panel), &image_path)?;
        tch::vision::image::save(&quantize(&row), &row_path)?;
        info!("saved {:?} {:?}", image_path, row_path);
        Ok((image_path, row_path))
    }

    pub fn save_ground_truth(&self, real: &Tensor) -> Result<PathBuf> {
        let path = self.ground_truth_path();
        let images = to_unit(real);
        tch::vision::image::save(&quantize(&grid(&images)), &path)?;
        Ok(path)
    }
}

/// `[n, OUTPUT_DIM]` in [-1, 1] to `[n, 3, 64, 64]` in [0, 1].
fn to_unit(images: &Tensor) -> Tensor {
    ((images.view([-1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]) + 1.) / 2.).clamp(0., 1.)
}

fn quantize(image: &Tensor) -> Tensor {
    (image * 255.).round().clamp(0., 255.).to_kind(Kind::Uint8)
}

/// Returns the `[3, rows * 64, 4 * 64]` panel and the `[3, 64, rows * 64]` strip.
pub fn comparison_panel(
    conditioning: &Tensor,
    fake: &Tensor,
    real: &Tensor,
    cond_size: i64,
    max_samples: i64,
) -> (Tensor, Tensor) {
    let feature = (conditioning.view([-1, CHANNELS, cond_size, cond_size]) + 1.) / 2.;
    let nearest = feature
        .upsample_nearest2d([IMAGE_SIZE, IMAGE_SIZE], None::<f64>, None::<f64>)
        .clamp(0., 1.);
    let bicubic = feature
        .upsample_bicubic2d([IMAGE_SIZE, IMAGE_SIZE], false, None::<f64>, None::<f64>)
        .clamp(0., 1.);
    let clipped = to_unit(fake);
    let real = to_unit(real);

    let rows = max_samples.min(clipped.size()[0]);
    // side by side along the width
    let panel = Tensor::cat(&[nearest, bicubic, clipped.shallow_clone(), real], 3).narrow(0, 0, rows);
    let panel = Tensor::cat(&panel.unbind(0), 1);
    let strip = Tensor::cat(&clipped.narrow(0, 0, rows).unbind(0), 2);
    (panel, strip)
}

/// Lays `[n, 3, h, w]` images out on a near-square grid.
fn grid(images: &Tensor) -> Tensor {
    let n = images.size()[0];
    let nh = (n as f64).sqrt() as i64;
    let nw = n / nh;
    let rows: Vec<Tensor> = (0..nh)
        .map(|i| Tensor::cat(&images.narrow(0, i * nw, nw).unbind(0), 2))
        .collect();
    Tensor::cat(&rows, 1)
}
