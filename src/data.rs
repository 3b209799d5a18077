use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Kind, Tensor};

use crate::error::{GanError, Result};
use crate::network::{CHANNELS, IMAGE_SIZE, OUTPUT_DIM};

/// Endless sequence of `[batch_size, 3, 64, 64]` uint8 batches over an
/// in-memory dataset, reshuffled at every epoch. The incomplete tail of an
/// epoch is dropped.
#[derive(Debug)]
pub struct BatchStream {
    images: Tensor,
    batch_size: i64,
    order: Vec<i64>,
    cursor: usize,
    epoch: usize,
    rng: StdRng,
}

impl BatchStream {
    pub fn new(images: Tensor, batch_size: i64, seed: Option<u64>) -> Result<Self> {
        Self::with_source(images, batch_size, seed, PathBuf::from("<memory>"))
    }

    /// Loads every image of `dir`, resized to 64x64.
    pub fn from_dir<P: AsRef<Path>>(dir: P, batch_size: i64, seed: Option<u64>) -> Result<Self> {
        let dir = dir.as_ref();
        let images = tch::vision::image::load_dir(dir, IMAGE_SIZE, IMAGE_SIZE)?;
        info!("loaded {} images from {:?}", images.size()[0], dir);
        Self::with_source(images, batch_size, seed, dir.to_path_buf())
    }

    fn with_source(images: Tensor, batch_size: i64, seed: Option<u64>, path: PathBuf) -> Result<Self> {
        if batch_size <= 0 {
            return Err(GanError::NonPositiveBatchSize(batch_size));
        }
        let size = images.size();
        if size.len() != 4 || size[1..] != [CHANNELS, IMAGE_SIZE, IMAGE_SIZE] {
            return Err(GanError::ImageShape(size));
        }
        if size[0] < batch_size {
            return Err(GanError::EmptyDataset {
                path,
                found: size[0],
                needed: batch_size,
            });
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut stream = BatchStream {
            images,
            batch_size,
            order: (0..size[0]).collect(),
            cursor: 0,
            epoch: 0,
            rng,
        };
        stream.order.shuffle(&mut stream.rng);
        Ok(stream)
    }

    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Number of images in the underlying dataset.
    pub fn dataset_len(&self) -> usize {
        self.order.len()
    }

    /// Completed passes over the dataset.
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl Iterator for BatchStream {
    type Item = Tensor;

    fn next(&mut self) -> Option<Tensor> {
        let batch = self.batch_size as usize;
        if self.cursor + batch > self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
            self.epoch += 1;
        }
        let index = Tensor::from_slice(&self.order[self.cursor..self.cursor + batch]);
        self.cursor += batch;
        Some(self.images.index_select(0, &index))
    }
}

/// Maps pixel values in [0, 255] to [-1, 1] and flattens to `[n, OUTPUT_DIM]`.
pub fn normalize(batch: &Tensor) -> Tensor {
    ((batch.to_kind(Kind::Float) / 255. - 0.5) * 2.).view([-1, OUTPUT_DIM])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn dataset(n: i64) -> Tensor {
        Tensor::arange(n, (Kind::Uint8, Device::Cpu))
            .view([n, 1, 1, 1])
            .expand([n, CHANNELS, IMAGE_SIZE, IMAGE_SIZE], false)
            .contiguous()
    }

    #[test]
    fn every_image_is_seen_once_per_epoch() {
        let mut stream = BatchStream::new(dataset(6), 2, Some(7)).unwrap();
        let mut seen: Vec<i64> = (0..3)
            .flat_map(|_| {
                let batch = stream.next().unwrap();
                assert_eq!(batch.size(), vec![2, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);
                Vec::<i64>::try_from(batch.select(1, 0).select(1, 0).select(1, 0).to_kind(Kind::Int64))
                    .unwrap()
            })
            .collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(stream.epoch(), 0);
        stream.next().unwrap();
        assert_eq!(stream.epoch(), 1);
    }

    #[test]
    fn too_small_dataset_is_rejected() {
        let err = BatchStream::new(dataset(3), 4, None).unwrap_err();
        assert!(matches!(err, GanError::EmptyDataset { found: 3, needed: 4, .. }));
    }

    #[test]
    fn non_positive_batch_size_is_rejected() {
        for batch_size in [0, -2] {
            assert!(matches!(
                BatchStream::new(dataset(4), batch_size, None),
                Err(GanError::NonPositiveBatchSize(b)) if b == batch_size
            ));
        }
    }

    #[test]
    fn tail_batch_is_dropped() {
        let mut stream = BatchStream::new(dataset(5), 2, Some(1)).unwrap();
        assert_eq!(stream.batch_size(), 2);
        assert_eq!(stream.dataset_len(), 5);
        stream.next().unwrap();
        stream.next().unwrap();
        assert_eq!(stream.epoch(), 0);
        // one image left over, so the third batch starts a new epoch
        assert_eq!(stream.next().unwrap().size()[0], 2);
        assert_eq!(stream.epoch(), 1);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let images = Tensor::zeros([4, 1, 64, 64], (Kind::Uint8, Device::Cpu));
        assert!(matches!(
            BatchStream::new(images, 2, None),
            Err(GanError::ImageShape(_))
        ));
    }

    #[test]
    fn normalize_maps_pixel_range() {
        let batch = Tensor::from_slice(&[0u8, 255u8]).view([2, 1, 1, 1]).expand(
            [2, CHANNELS, IMAGE_SIZE, IMAGE_SIZE],
            false,
        );
        let out = normalize(&batch);
        assert_eq!(out.size(), vec![2, OUTPUT_DIM]);
        assert!((out.min().double_value(&[]) + 1.).abs() < 1e-6);
        assert!((out.max().double_value(&[]) - 1.).abs() < 1e-6);
    }
}
