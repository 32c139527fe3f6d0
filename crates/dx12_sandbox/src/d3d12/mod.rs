//! The Direct3D 12 implementation of [`crate::gpu::Api`].

mod compile_shader;
mod create_device;
mod create_pipeline;
mod objects;

pub use create_device::create_device;
pub use objects::D3d12CommandAllocator;
pub use objects::D3d12CommandList;
pub use objects::D3d12DescriptorHeap;
pub use objects::D3d12Device;
pub use objects::D3d12Fence;
pub use objects::D3d12Mapping;
pub use objects::D3d12Queue;
pub use objects::D3d12Resource;
pub use objects::D3d12SwapChain;

use eyre::WrapErr;
use tracing::info;
use tracing::warn;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;

use crate::FRAME_COUNT;
use crate::config::SandboxConfig;
use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::GpuContext;

pub struct D3d12Api;

impl Api for D3d12Api {
    type Device = D3d12Device;
    type Queue = D3d12Queue;
    type SwapChain = D3d12SwapChain;
    type Fence = D3d12Fence;
    type CommandAllocator = D3d12CommandAllocator;
    type CommandList = D3d12CommandList;
    type Resource = D3d12Resource;
    type Mapping = D3d12Mapping;
    type DescriptorHeap = D3d12DescriptorHeap;
    type RenderTargetView = D3D12_CPU_DESCRIPTOR_HANDLE;
    type DepthStencilView = D3D12_CPU_DESCRIPTOR_HANDLE;
    type RootSignature = ID3D12RootSignature;
    type PipelineState = ID3D12PipelineState;
}

/// Creates the device, a direct queue and a flip-discard swap chain of
/// [`FRAME_COUNT`] buffers bound to `hwnd`.
pub fn create_context(config: &SandboxConfig, hwnd: HWND) -> SandboxResult<GpuContext<D3d12Api>> {
    let (factory, device) = create_device(config.use_warp_device)?;

    let queue: ID3D12CommandQueue = unsafe {
        device.CreateCommandQueue(&D3D12_COMMAND_QUEUE_DESC {
            Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
            ..Default::default()
        })
    }
    .wrap_err("creating the command queue")?;

    let (width, height) = config.window_size;
    let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
        BufferCount: FRAME_COUNT as u32,
        Width: width,
        Height: height,
        Format: DXGI_FORMAT_R8G8B8A8_UNORM,
        BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
        SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        ..Default::default()
    };

    let swap_chain: IDXGISwapChain3 = unsafe {
        factory.CreateSwapChainForHwnd(&queue, hwnd, &swap_chain_desc, None, None)
    }
    .wrap_err("creating the swap chain")?
    .cast()?;

    unsafe { factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER) }?;

    let mut swap_chain = D3d12SwapChain::new(&device, swap_chain, FRAME_COUNT as u32)?;
    if config.fullscreen {
        if let Err(error) = swap_chain.enter_fullscreen() {
            warn!("Staying windowed: {error:#}");
        }
    }

    info!("Direct3D 12 context ready at {width}x{height}");
    Ok(GpuContext {
        device: D3d12Device::new(device),
        queue: D3d12Queue::new(queue),
        swap_chain,
    })
}
