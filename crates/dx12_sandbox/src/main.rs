use std::process::ExitCode;
use std::time::Duration;

use dx12_sandbox::FRAME_COUNT;
use dx12_sandbox::config::SandboxConfig;
use dx12_sandbox::error::SandboxResult;
use dx12_sandbox::session::RenderSession;
use dx12_sandbox::session::SceneAssets;
use dx12_sandbox::sim::GpuPacing;
use dx12_sandbox::sim::SimApi;
use dx12_sandbox::sim::SimGpu;
use tracing::error;
use tracing::info;

fn main() -> ExitCode {
    if let Err(report) = color_eyre::install() {
        eprintln!("Failed to install the error reporter: {report:?}");
    }
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            error!("{report:?}");
            #[cfg(windows)]
            dx12_sandbox::window::show_fatal_error(&format!("{report:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> SandboxResult<()> {
    let config = SandboxConfig::from_args(std::env::args())?;
    match config.headless_frames {
        Some(frames) => run_headless(&config, frames),
        None => run_windowed(&config),
    }
}

/// Renders `frames` frames against the software GPU.
fn run_headless(config: &SandboxConfig, frames: u32) -> SandboxResult<()> {
    let gpu = SimGpu::new(GpuPacing::Delay(Duration::from_micros(500)));
    let context = gpu.context(FRAME_COUNT as u32, config.window_size);
    let assets = SceneAssets::load(config)?;
    let mut session = RenderSession::<SimApi>::new(context, config, &assets)?;

    while session.is_running() && session.frames_rendered() < frames as u64 {
        session.update();
        session.render();
    }
    session.cleanup();

    let stats = gpu.stats();
    info!(
        "Rendered {} frames; {} lists executed, at most {} in flight",
        session.frames_rendered(),
        stats.executed_lists,
        stats.max_in_flight
    );
    for violation in gpu.violations() {
        error!("Validation: {violation}");
    }
    if session.frames_rendered() < frames as u64 {
        eyre::bail!("stopped after {} of {frames} frames", session.frames_rendered());
    }
    Ok(())
}

#[cfg(windows)]
fn run_windowed(config: &SandboxConfig) -> SandboxResult<()> {
    dx12_sandbox::window::run(config)
}

#[cfg(not(windows))]
fn run_windowed(_config: &SandboxConfig) -> SandboxResult<()> {
    eyre::bail!("windowed rendering needs Direct3D 12; pass --headless FRAMES instead")
}
