// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line, installs logging, picks the burn
// backend for --device and hands everything else to Layer 2:
//
//   gpu        → Autodiff<Wgpu>, error when no adapter exists
//   auto       → Autodiff<Wgpu>, or Autodiff<NdArray> when no
//                adapter exists
//   cpu        → Autodiff<NdArray>
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod args;

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::{backend::AutodiffBackend, Tensor},
};
use clap::Parser;
use std::panic;

use crate::application::{
    config::{ComputeDevice, TaskConfig},
    run_use_case::RunUseCase,
};
use crate::infra::logging;
use crate::ml::runner::BurnTaskRunner;
use args::RunArgs;

#[derive(Parser, Debug)]
#[command(
    name = "relation-extraction",
    version,
    about = "Fine-tune a transformer relation classifier, then evaluate and label new sentences."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: RunArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let cfg: TaskConfig = self.args.into();
        logging::init(cfg.log_file.as_deref(), cfg.log_lvl)?;

        let device = cfg.device.resolve(wgpu_adapter_available).map_err(|msg| {
            tracing::error!("{msg}");
            anyhow::anyhow!(msg)
        })?;
        match device {
            ComputeDevice::Gpu => run_on::<Autodiff<Wgpu>>(&cfg, WgpuDevice::default()),
            ComputeDevice::Cpu => run_on::<Autodiff<NdArray>>(&cfg, NdArrayDevice::Cpu),
        }
    }
}

/// True when wgpu can open an adapter. The runtime panics during
/// setup when none exists, so setup runs under catch_unwind with the
/// panic hook silenced.
fn wgpu_adapter_available() -> bool {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let found = panic::catch_unwind(|| {
        Tensor::<Wgpu, 1>::zeros([1], &WgpuDevice::default()).into_data();
    })
    .is_ok();
    panic::set_hook(hook);
    found
}

fn run_on<B: AutodiffBackend>(cfg: &TaskConfig, device: B::Device) -> Result<()> {
    RunUseCase::new(cfg)
        .execute(|cfg, rngs| BurnTaskRunner::<B>::new(cfg, device, rngs))
        .map_err(|err| {
            // stage failures are logged where they happen
            if err.is_rejected_up_front() {
                tracing::error!("{err}");
            }
            err
        })?;
    Ok(())
}
