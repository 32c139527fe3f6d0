//! The seam between the render core and a graphics backend.
//!
//! The frame synchronizer, command recorder and upload pipeline are written
//! once against [`Api`]. The Direct3D 12 backend implements it on Windows and
//! the software GPU in [`crate::sim`] implements it everywhere.

pub mod adapter;
pub mod resource_state;
pub mod tracked_resource;

pub use adapter::AdapterInfo;
pub use adapter::select_hardware_adapter;
pub use resource_state::ResourceState;
pub use tracked_resource::TrackedResource;

use crate::config::ShaderPaths;
use crate::error::SandboxResult;

/// Bundle of backend object types.
pub trait Api: Sized + 'static {
    type Device: Device<Self>;
    type Queue: Queue<Self>;
    type SwapChain: SwapChain<Self>;
    type Fence: Fence;
    type CommandAllocator: CommandAllocator;
    type CommandList: CommandList<Self>;
    type Resource;
    type Mapping: MappedMemory;
    type DescriptorHeap;
    type RenderTargetView: Copy;
    type DepthStencilView: Copy;
    type RootSignature;
    type PipelineState;
}

/// Everything a backend hands over once a device, queue and swap chain exist.
pub struct GpuContext<A: Api> {
    pub device: A::Device,
    pub queue: A::Queue,
    pub swap_chain: A::SwapChain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeapKind {
    /// Device-local memory, not CPU visible.
    Default,
    /// CPU-visible memory the GPU reads across the bus.
    Upload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub fn row_size(&self) -> u64 {
        self.width as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Layout of a texture's single subresource inside an upload buffer, as the
/// driver reports it. `row_pitch` may exceed `row_size` because of padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyFootprint {
    pub offset: u64,
    pub row_pitch: u32,
    pub row_size: u64,
    pub rows: u32,
    pub total_bytes: u64,
    pub desc: TextureDesc,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Root signature parameter slots, fixed by the pipeline layout.
pub mod root_parameter {
    /// Descriptor table holding the per-frame constant buffer view (b0).
    pub const CONSTANTS: u32 = 0;
    /// Descriptor table holding the texture view (t0).
    pub const TEXTURE: u32 = 1;
}

/// Slots inside each frame's shader-visible descriptor heap.
pub mod descriptor_slot {
    pub const CONSTANT_BUFFER: u32 = 0;
    pub const TEXTURE: u32 = 1;
    pub const COUNT: u32 = 2;
}

pub trait Device<A: Api> {
    fn create_command_allocator(&self) -> SandboxResult<A::CommandAllocator>;

    /// Creates a command list in the recording state.
    fn create_command_list(
        &self,
        allocator: &A::CommandAllocator,
        pipeline: &A::PipelineState,
    ) -> SandboxResult<A::CommandList>;

    fn create_fence(&self, initial_value: u64) -> SandboxResult<A::Fence>;

    fn create_buffer(
        &self,
        heap: HeapKind,
        size: u64,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<A::Resource>;

    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<A::Resource>;

    /// Creates a D32 depth buffer in `DepthWrite` and its view.
    fn create_depth_stencil(
        &self,
        width: u32,
        height: u32,
    ) -> SandboxResult<(A::Resource, A::DepthStencilView)>;

    fn texture_copy_footprint(&self, desc: &TextureDesc) -> CopyFootprint;

    /// Maps an upload-heap resource. The mapping stays valid until dropped.
    fn map(&self, resource: &A::Resource, size: u64) -> SandboxResult<A::Mapping>;

    fn create_descriptor_heap(&self, descriptors: u32, name: &str)
    -> SandboxResult<A::DescriptorHeap>;

    fn write_constant_buffer_view(
        &self,
        heap: &A::DescriptorHeap,
        slot: u32,
        buffer: &A::Resource,
        size: u32,
    );

    fn write_texture_view(
        &self,
        heap: &A::DescriptorHeap,
        slot: u32,
        texture: &A::Resource,
        desc: &TextureDesc,
    );

    fn create_pipeline(
        &self,
        shaders: &ShaderPaths,
    ) -> SandboxResult<(A::RootSignature, A::PipelineState)>;
}

pub trait Queue<A: Api> {
    fn execute(&self, list: &A::CommandList);

    /// Schedules `value` to be written to `fence` after all previously
    /// enqueued work completes.
    fn signal(&self, fence: &A::Fence, value: u64) -> SandboxResult<()>;
}

pub trait SwapChain<A: Api> {
    fn buffer_count(&self) -> u32;
    fn current_back_buffer_index(&self) -> u32;
    fn back_buffer(&self, index: u32) -> SandboxResult<A::Resource>;
    fn render_target_view(&self, index: u32) -> A::RenderTargetView;
    fn present(&mut self, sync_interval: u32) -> SandboxResult<()>;

    fn leave_fullscreen(&self) -> SandboxResult<()> {
        Ok(())
    }
}

pub trait Fence {
    fn completed_value(&self) -> u64;

    /// Blocks the calling thread until the fence reaches `value`. There is no
    /// timeout; failing to register the wake event is an error.
    fn wait_for_value(&self, value: u64) -> SandboxResult<()>;
}

pub trait CommandAllocator {
    fn reset(&self) -> SandboxResult<()>;
}

pub trait CommandList<A: Api> {
    fn reset(
        &mut self,
        allocator: &A::CommandAllocator,
        pipeline: &A::PipelineState,
    ) -> SandboxResult<()>;

    fn resource_barrier(
        &mut self,
        resource: &A::Resource,
        before: ResourceState,
        after: ResourceState,
    );

    fn set_render_target(&mut self, rtv: A::RenderTargetView, dsv: A::DepthStencilView);
    fn clear_render_target(&mut self, rtv: A::RenderTargetView, color: [f32; 4]);
    fn clear_depth(&mut self, dsv: A::DepthStencilView, depth: f32);
    fn set_root_signature(&mut self, root_signature: &A::RootSignature);
    fn set_descriptor_heap(&mut self, heap: &A::DescriptorHeap);
    fn set_root_descriptor_table(&mut self, parameter: u32, heap: &A::DescriptorHeap, slot: u32);
    fn set_viewport(&mut self, viewport: Viewport);
    fn set_vertex_buffer(&mut self, buffer: &A::Resource, stride: u32, size: u32);
    fn set_index_buffer(&mut self, buffer: &A::Resource, size: u32);
    fn draw_indexed(&mut self, index_count: u32);
    fn copy_buffer(&mut self, dst: &A::Resource, src: &A::Resource, size: u64);
    fn copy_texture(&mut self, dst: &A::Resource, src: &A::Resource, footprint: &CopyFootprint);

    /// A list must be closed before it is executed.
    fn close(&mut self) -> SandboxResult<()>;
}

/// A persistently mapped, CPU-visible region.
pub trait MappedMemory {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&mut self, offset: usize, bytes: &[u8]);
    fn read(&self, offset: usize, out: &mut [u8]);
}
