use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use eyre::WrapErr;
use eyre::eyre;

use super::FailurePoint;
use super::SimApi;
use super::SimGpu;
use super::Violation;
use super::timeline::Command;
use crate::config::ShaderPaths;
use crate::error::GpuError;
use crate::error::SandboxResult;
use crate::gpu::CommandAllocator;
use crate::gpu::CommandList;
use crate::gpu::CopyFootprint;
use crate::gpu::Device;
use crate::gpu::Fence;
use crate::gpu::HeapKind;
use crate::gpu::MappedMemory;
use crate::gpu::Queue;
use crate::gpu::ResourceState;
use crate::gpu::SwapChain;
use crate::gpu::TextureDesc;
use crate::gpu::Viewport;

/// Row pitch alignment for texture copies, the same as Direct3D 12.
const TEXTURE_PITCH_ALIGNMENT: u64 = 256;

struct ResourceHandle {
    id: u64,
    gpu: SimGpu,
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.gpu.timeline().release_resource(self.id);
    }
}

/// Reference-counted resource. The resource is released when the last clone drops.
#[derive(Clone)]
pub struct SimResource {
    handle: Arc<ResourceHandle>,
}

impl SimResource {
    fn new(gpu: &SimGpu, id: u64) -> Self {
        Self {
            handle: Arc::new(ResourceHandle {
                id,
                gpu: gpu.clone(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.handle.id
    }
}

/// A render-target or depth-stencil view: the id of the viewed resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimView(pub u64);

pub struct SimDescriptorHeap {
    id: u64,
}

pub struct SimRootSignature;

pub struct SimPipelineState;

fn ensure_alive(gpu: &SimGpu) -> SandboxResult<()> {
    if gpu.timeline().device_lost {
        return Err(GpuError::DeviceLost.into());
    }
    Ok(())
}

pub struct SimDevice {
    gpu: SimGpu,
}

impl SimDevice {
    pub(crate) fn new(gpu: SimGpu) -> Self {
        Self { gpu }
    }

    fn create_resource(
        &self,
        heap: HeapKind,
        size: u64,
        state: ResourceState,
        name: &str,
    ) -> SandboxResult<SimResource> {
        ensure_alive(&self.gpu)?;
        let id = self.gpu.timeline().add_resource(name, heap, state, size);
        Ok(SimResource::new(&self.gpu, id))
    }
}

impl Device<SimApi> for SimDevice {
    fn create_command_allocator(&self) -> SandboxResult<SimCommandAllocator> {
        ensure_alive(&self.gpu)?;
        Ok(SimCommandAllocator {
            id: self.gpu.timeline().next_id(),
            gpu: self.gpu.clone(),
        })
    }

    fn create_command_list(
        &self,
        allocator: &SimCommandAllocator,
        _pipeline: &SimPipelineState,
    ) -> SandboxResult<SimCommandList> {
        ensure_alive(&self.gpu)?;
        Ok(SimCommandList {
            gpu: self.gpu.clone(),
            allocator: allocator.id,
            commands: Vec::new(),
            closed: false,
        })
    }

    fn create_fence(&self, initial_value: u64) -> SandboxResult<SimFence> {
        ensure_alive(&self.gpu)?;
        Ok(SimFence {
            gpu: self.gpu.clone(),
            completed: Arc::new(AtomicU64::new(initial_value)),
        })
    }

    fn create_buffer(
        &self,
        heap: HeapKind,
        size: u64,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<SimResource> {
        self.create_resource(heap, size, initial_state, name)
    }

    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<SimResource> {
        let size = desc.row_size() * desc.height as u64;
        self.create_resource(HeapKind::Default, size, initial_state, name)
    }

    fn create_depth_stencil(&self, width: u32, height: u32) -> SandboxResult<(SimResource, SimView)> {
        let resource = self.create_resource(
            HeapKind::Default,
            width as u64 * height as u64 * 4,
            ResourceState::DepthWrite,
            "Depth/Stencil Resource Heap",
        )?;
        let view = SimView(resource.id());
        Ok((resource, view))
    }

    fn texture_copy_footprint(&self, desc: &TextureDesc) -> CopyFootprint {
        let row_size = desc.row_size();
        let row_pitch = row_size.div_ceil(TEXTURE_PITCH_ALIGNMENT) * TEXTURE_PITCH_ALIGNMENT;
        CopyFootprint {
            offset: 0,
            row_pitch: row_pitch as u32,
            row_size,
            rows: desc.height,
            total_bytes: row_pitch * (desc.height as u64 - 1) + row_size,
            desc: *desc,
        }
    }

    fn map(&self, resource: &SimResource, size: u64) -> SandboxResult<SimMapping> {
        let timeline = self.gpu.timeline();
        let record = timeline
            .resources
            .get(&resource.id())
            .ok_or_else(|| eyre!("mapping an unknown resource"))?;
        if record.heap != HeapKind::Upload {
            return Err(eyre!("{} is not CPU visible", record.name));
        }
        if (record.data.len() as u64) < size {
            return Err(eyre!(
                "mapping {size} bytes of {} which holds {}",
                record.name,
                record.data.len()
            ));
        }
        drop(timeline);
        Ok(SimMapping {
            resource: resource.clone(),
            len: size as usize,
        })
    }

    fn create_descriptor_heap(&self, descriptors: u32, _name: &str) -> SandboxResult<SimDescriptorHeap> {
        ensure_alive(&self.gpu)?;
        let mut timeline = self.gpu.timeline();
        let id = timeline.next_id();
        timeline.heaps.insert(id, vec![None; descriptors as usize]);
        Ok(SimDescriptorHeap { id })
    }

    fn write_constant_buffer_view(
        &self,
        heap: &SimDescriptorHeap,
        slot: u32,
        buffer: &SimResource,
        _size: u32,
    ) {
        write_descriptor(&self.gpu, heap, slot, buffer);
    }

    fn write_texture_view(
        &self,
        heap: &SimDescriptorHeap,
        slot: u32,
        texture: &SimResource,
        _desc: &TextureDesc,
    ) {
        write_descriptor(&self.gpu, heap, slot, texture);
    }

    /// Reads both sources and checks each defines its entry point.
    fn create_pipeline(
        &self,
        shaders: &ShaderPaths,
    ) -> SandboxResult<(SimRootSignature, SimPipelineState)> {
        for path in [&shaders.vertex, &shaders.pixel] {
            let source = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading shader {}", path.display()))?;
            if !source.contains("main(") {
                return Err(GpuError::ShaderCompilation {
                    path: path.display().to_string(),
                    diagnostic: "entrypoint not found".into(),
                }
                .into());
            }
        }
        Ok((SimRootSignature, SimPipelineState))
    }
}

fn write_descriptor(gpu: &SimGpu, heap: &SimDescriptorHeap, slot: u32, resource: &SimResource) {
    if let Some(slots) = gpu.timeline().heaps.get_mut(&heap.id) {
        if let Some(descriptor) = slots.get_mut(slot as usize) {
            *descriptor = Some(resource.id());
        }
    }
}

pub struct SimQueue {
    gpu: SimGpu,
}

impl SimQueue {
    pub(crate) fn new(gpu: SimGpu) -> Self {
        Self { gpu }
    }
}

impl Queue<SimApi> for SimQueue {
    fn execute(&self, list: &SimCommandList) {
        let mut timeline = self.gpu.timeline();
        if timeline.device_lost {
            return;
        }
        if !list.closed {
            timeline.violation(Violation::ExecuteOpenList);
            return;
        }
        timeline.submit(list.allocator, list.commands.clone());
    }

    fn signal(&self, fence: &SimFence, value: u64) -> SandboxResult<()> {
        let mut timeline = self.gpu.timeline();
        if timeline.device_lost {
            return Err(GpuError::DeviceLost.into());
        }
        if timeline.take_failure(FailurePoint::Signal) {
            return Err(GpuError::Injected("signal").into());
        }
        timeline.signal(fence.completed.clone(), value);
        drop(timeline);
        self.gpu.notify();
        Ok(())
    }
}

pub struct SimSwapChain {
    gpu: SimGpu,
    buffers: Vec<SimResource>,
    current: u32,
}

impl SimSwapChain {
    pub(crate) fn new(gpu: SimGpu, buffer_count: u32, size: (u32, u32)) -> Self {
        let buffers = (0..buffer_count)
            .map(|index| {
                let id = gpu.timeline().add_resource(
                    &format!("Back Buffer {index}"),
                    HeapKind::Default,
                    ResourceState::Present,
                    size.0 as u64 * size.1 as u64 * 4,
                );
                SimResource::new(&gpu, id)
            })
            .collect();
        Self {
            gpu,
            buffers,
            current: 0,
        }
    }
}

impl SwapChain<SimApi> for SimSwapChain {
    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn back_buffer(&self, index: u32) -> SandboxResult<SimResource> {
        self.buffers
            .get(index as usize)
            .cloned()
            .ok_or_else(|| eyre!("no back buffer {index}"))
    }

    fn render_target_view(&self, index: u32) -> SimView {
        SimView(self.buffers[index as usize].id())
    }

    fn present(&mut self, _sync_interval: u32) -> SandboxResult<()> {
        let mut timeline = self.gpu.timeline();
        if timeline.device_lost {
            return Err(GpuError::DeviceLost.into());
        }
        if timeline.take_failure(FailurePoint::Present) {
            return Err(GpuError::Injected("present").into());
        }
        timeline.present(self.buffers[self.current as usize].id());
        self.current = (self.current + 1) % self.buffers.len() as u32;
        Ok(())
    }
}

pub struct SimFence {
    gpu: SimGpu,
    completed: Arc<AtomicU64>,
}

impl Fence for SimFence {
    /// Reads `u64::MAX` once the device is lost, like a removed device.
    fn completed_value(&self) -> u64 {
        if self.gpu.timeline().device_lost {
            return u64::MAX;
        }
        self.completed.load(Ordering::SeqCst)
    }

    fn wait_for_value(&self, value: u64) -> SandboxResult<()> {
        let mut timeline = self.gpu.timeline();
        loop {
            if timeline.device_lost || self.completed.load(Ordering::SeqCst) >= value {
                return Ok(());
            }
            if timeline.take_failure(FailurePoint::FenceEvent) {
                return Err(GpuError::FenceEventRegistration { value }.into());
            }
            timeline = self.gpu.wait_for_progress(timeline);
        }
    }
}

pub struct SimCommandAllocator {
    id: u64,
    gpu: SimGpu,
}

impl CommandAllocator for SimCommandAllocator {
    fn reset(&self) -> SandboxResult<()> {
        let mut timeline = self.gpu.timeline();
        if timeline.take_failure(FailurePoint::AllocatorReset) {
            return Err(GpuError::Injected("command allocator reset").into());
        }
        if timeline.in_flight_uses_allocator(self.id) {
            timeline.violation(Violation::AllocatorResetWhileInFlight);
        }
        Ok(())
    }
}

pub struct SimCommandList {
    gpu: SimGpu,
    allocator: u64,
    commands: Vec<Command>,
    closed: bool,
}

impl SimCommandList {
    fn record(&mut self, command: Command) {
        debug_assert!(!self.closed, "recording into a closed command list");
        self.commands.push(command);
    }
}

impl CommandList<SimApi> for SimCommandList {
    fn reset(
        &mut self,
        allocator: &SimCommandAllocator,
        _pipeline: &SimPipelineState,
    ) -> SandboxResult<()> {
        let mut timeline = self.gpu.timeline();
        if timeline.take_failure(FailurePoint::ListReset) {
            return Err(GpuError::Injected("command list reset").into());
        }
        if !self.closed {
            return Err(eyre!("command list reset while still recording"));
        }
        timeline.stats.list_resets += 1;
        drop(timeline);

        self.allocator = allocator.id;
        self.commands.clear();
        self.closed = false;
        Ok(())
    }

    fn resource_barrier(&mut self, resource: &SimResource, before: ResourceState, after: ResourceState) {
        self.record(Command::Barrier {
            resource: resource.id(),
            before,
            after,
        });
    }

    fn set_render_target(&mut self, rtv: SimView, _dsv: SimView) {
        self.record(Command::SetRenderTarget { render_target: rtv.0 });
    }

    fn clear_render_target(&mut self, _rtv: SimView, _color: [f32; 4]) {
        self.record(Command::ClearRenderTarget);
    }

    fn clear_depth(&mut self, _dsv: SimView, _depth: f32) {
        self.record(Command::ClearDepth);
    }

    fn set_root_signature(&mut self, _root_signature: &SimRootSignature) {
        self.record(Command::SetRootSignature);
    }

    fn set_descriptor_heap(&mut self, _heap: &SimDescriptorHeap) {
        self.record(Command::SetDescriptorHeap);
    }

    fn set_root_descriptor_table(&mut self, parameter: u32, heap: &SimDescriptorHeap, slot: u32) {
        self.record(Command::SetRootDescriptorTable {
            parameter,
            heap: heap.id,
            slot,
        });
    }

    fn set_viewport(&mut self, _viewport: Viewport) {
        self.record(Command::SetViewport);
    }

    fn set_vertex_buffer(&mut self, buffer: &SimResource, _stride: u32, _size: u32) {
        self.record(Command::SetVertexBuffer {
            resource: buffer.id(),
        });
    }

    fn set_index_buffer(&mut self, buffer: &SimResource, _size: u32) {
        self.record(Command::SetIndexBuffer {
            resource: buffer.id(),
        });
    }

    fn draw_indexed(&mut self, _index_count: u32) {
        self.record(Command::DrawIndexed);
    }

    fn copy_buffer(&mut self, dst: &SimResource, src: &SimResource, size: u64) {
        self.record(Command::CopyBuffer {
            dst: dst.id(),
            src: src.id(),
            size,
        });
    }

    fn copy_texture(&mut self, dst: &SimResource, src: &SimResource, footprint: &CopyFootprint) {
        self.record(Command::CopyTexture {
            dst: dst.id(),
            src: src.id(),
            footprint: *footprint,
        });
    }

    fn close(&mut self) -> SandboxResult<()> {
        if self.gpu.timeline().take_failure(FailurePoint::Close) {
            return Err(GpuError::Injected("command list close").into());
        }
        if self.closed {
            return Err(eyre!("command list closed twice"));
        }
        self.closed = true;
        Ok(())
    }
}

/// CPU view of an upload-heap resource. Holds the resource alive while mapped.
pub struct SimMapping {
    resource: SimResource,
    len: usize,
}

impl SimMapping {
    fn gpu(&self) -> &SimGpu {
        &self.resource.handle.gpu
    }
}

impl MappedMemory for SimMapping {
    fn len(&self) -> usize {
        self.len
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        let id = self.resource.id();
        let mut timeline = self.gpu().timeline();
        if timeline.in_flight_uses_resource(id) {
            let resource = timeline.resource_name(id);
            timeline.violation(Violation::MappedWriteWhileInFlight { resource });
        }
        if let Some(record) = timeline.resources.get_mut(&id) {
            record.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    fn read(&self, offset: usize, out: &mut [u8]) {
        let timeline = self.gpu().timeline();
        if let Some(record) = timeline.resources.get(&self.resource.id()) {
            out.copy_from_slice(&record.data[offset..offset + out.len()]);
        }
    }
}
