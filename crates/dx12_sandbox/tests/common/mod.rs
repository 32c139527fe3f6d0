#![allow(dead_code)]

use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use dx12_sandbox::config::SandboxConfig;
use dx12_sandbox::scene::MeshData;
use dx12_sandbox::session::RenderSession;
use dx12_sandbox::session::SceneAssets;
use dx12_sandbox::sim::SimApi;
use dx12_sandbox::sim::SimGpu;
use dx12_sandbox::upload::TextureData;

pub fn test_config() -> SandboxConfig {
    SandboxConfig {
        window_size: (64, 48),
        ..SandboxConfig::default()
    }
}

pub fn test_assets() -> eyre::Result<SceneAssets> {
    Ok(SceneAssets {
        mesh: MeshData::cube(),
        texture: TextureData::checkerboard(8, 8, 2)?,
    })
}

/// A session with `N` slots over a swap chain of `N` back buffers.
pub fn start_session<const N: usize>(gpu: &SimGpu) -> eyre::Result<RenderSession<SimApi, N>> {
    let config = test_config();
    let context = gpu.context(N as u32, config.window_size);
    RenderSession::new(context, &config, &test_assets()?)
}

pub fn render_frames<const N: usize>(session: &mut RenderSession<SimApi, N>, frames: usize) {
    for _ in 0..frames {
        session.update();
        session.render();
    }
}

/// Polls `condition` for up to two seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Releases `lists` from another thread once work is queued and the caller
/// has had time to block on it.
pub fn release_later(gpu: &SimGpu, lists: u64) -> JoinHandle<()> {
    let gpu = gpu.clone();
    std::thread::spawn(move || {
        wait_until(|| gpu.pending_lists() > 0);
        std::thread::sleep(Duration::from_millis(50));
        gpu.release(lists);
    })
}
