use approx::assert_abs_diff_eq;
use srgan::architecture::{self, ARCHITECTURE_COUNT};
use srgan::network::OUTPUT_DIM;
use srgan::norm::Role;
use srgan::residual_block::{Resample, ResidualBlock};
use srgan::{ConfigError, Mode, NetConfig};
use tch::{nn, Device, Kind, Tensor};

#[test]
fn every_registered_pair_maps_conditioning_to_scores() {
    let _guard = tch::no_grad_guard();
    for index in 0..ARCHITECTURE_COUNT {
        let vs = nn::VarStore::new(Device::Cpu);
        let cfg = NetConfig::new(Mode::WganGp).with_dim(8);
        let (gen_kind, disc_kind) = architecture::select(index).unwrap();
        let gen = gen_kind.build(&(vs.root() / "generator"), &cfg).unwrap();
        let disc = disc_kind.build(&(vs.root() / "discriminator"), &cfg).unwrap();

        let cond = Tensor::rand([2, cfg.input_dim()], (Kind::Float, Device::Cpu));
        let fake = gen.generate(2, Some(&cond), true);
        assert_eq!(fake.size(), vec![2, OUTPUT_DIM], "architecture {}", index);
        assert!(fake.abs().max().double_value(&[]) <= 1.);
        assert_eq!(disc.score(&fake, true).size(), vec![2], "architecture {}", index);
    }
}

#[test]
fn unregistered_index_is_rejected() {
    assert!(matches!(
        architecture::select(99),
        Err(ConfigError::UnknownArchitecture(99))
    ));
}

#[test]
fn zeroed_residual_branch_is_identity() {
    let vs = nn::VarStore::new(Device::Cpu);
    let cfg = NetConfig::new(Mode::Lsgan).with_dim(8);
    let block = ResidualBlock::new(
        vs.root() / "block",
        8,
        8,
        3,
        Resample::None,
        &cfg,
        Role::Generator,
    )
    .unwrap();
    tch::no_grad(|| {
        for (name, mut var) in vs.variables() {
            if name.starts_with("block.conv2") {
                let _ = var.zero_();
            }
        }
    });

    let xs = Tensor::randn([2, 8, 8, 8], (Kind::Float, Device::Cpu));
    let ys = xs.apply_t(&block, true);
    let diff = (ys - &xs).abs().max().double_value(&[]);
    assert_abs_diff_eq!(diff, 0., epsilon = 1e-6);
}
