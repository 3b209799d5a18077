use approx::assert_abs_diff_eq;
use srgan::downsample::{DownsampleMethod, Downsampler};
use srgan::loss::{gradient_penalty, l1_reconstruction, LossEngine};
use srgan::network::OUTPUT_DIM;
use srgan::{Discriminator, Mode};
use tch::{Device, Kind, Tensor};

/// Scores each image by a scaled copy of its first pixel, so the input
/// gradient norm equals `scale` everywhere.
#[derive(Debug)]
struct FirstPixel {
    scale: f64,
}

impl Discriminator for FirstPixel {
    fn score(&self, images: &Tensor, _train: bool) -> Tensor {
        images.select(1, 0) * self.scale
    }
}

fn images(n: i64) -> Tensor {
    Tensor::rand([n, OUTPUT_DIM], (Kind::Float, Device::Cpu)) * 2. - 1.
}

#[test]
fn unit_slope_critic_has_no_penalty() {
    let gp = gradient_penalty(&FirstPixel { scale: 1. }, &images(4), &images(4), true);
    assert_abs_diff_eq!(gp.double_value(&[]), 0., epsilon = 1e-6);
}

#[test]
fn doubled_slope_critic_is_penalized_by_one() {
    let gp = gradient_penalty(&FirstPixel { scale: 2. }, &images(4), &images(4), true);
    assert_abs_diff_eq!(gp.double_value(&[]), 1., epsilon = 1e-5);
}

#[test]
fn gradient_penalty_is_added_only_for_wgan_gp() {
    let disc = FirstPixel { scale: 2. };
    let real = images(4);
    let fake = images(4);
    let plain = LossEngine::new(Mode::Wgan, 10., 0.9)
        .critic_cost(&disc, &real, &fake, true)
        .double_value(&[]);
    let penalized = LossEngine::new(Mode::WganGp, 10., 0.9)
        .critic_cost(&disc, &real, &fake, true)
        .double_value(&[]);
    assert_abs_diff_eq!(penalized - plain, 10., epsilon = 1e-4);
}

#[test]
fn full_l1_weight_ignores_the_critic() {
    let real = images(3);
    let fake = images(3);
    let downsampler = Downsampler::new(4, DownsampleMethod::Conv, Device::Cpu).unwrap();
    let conditioning = downsampler.downsample(&real);
    let engine = LossEngine::new(Mode::Dcgan, 10., 1.);

    let a = engine.generator_cost(&FirstPixel { scale: 1. }, &downsampler, &fake, &conditioning, true);
    let b = engine.generator_cost(&FirstPixel { scale: -7. }, &downsampler, &fake, &conditioning, true);
    assert_abs_diff_eq!(a.total.double_value(&[]), b.total.double_value(&[]), epsilon = 1e-6);
    assert_abs_diff_eq!(
        a.total.double_value(&[]),
        l1_reconstruction(&downsampler, &fake, &conditioning).double_value(&[]),
        epsilon = 1e-6
    );
}

#[test]
fn constant_images_survive_both_downsample_methods() {
    let flat = Tensor::full([2, OUTPUT_DIM], 0.25, (Kind::Float, Device::Cpu));
    for method in [DownsampleMethod::Conv, DownsampleMethod::Area] {
        let down = Downsampler::new(4, method, Device::Cpu).unwrap();
        let out = down.downsample(&flat);
        assert_eq!(out.size(), vec![2, 768]);
        assert_abs_diff_eq!(out.min().double_value(&[]), 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out.max().double_value(&[]), 0.25, epsilon = 1e-6);
    }
}
