use std::mem::ManuallyDrop;

use eyre::WrapErr;
use eyre::eyre;
use tracing::warn;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::*;
use windows::core::*;

use super::D3d12Api;
use super::create_pipeline::create_pipeline_state;
use super::create_pipeline::create_root_signature;
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
use crate::gpu::TextureFormat;
use crate::gpu::Viewport;

fn d3d12_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    match state {
        ResourceState::CopyDest => D3D12_RESOURCE_STATE_COPY_DEST,
        ResourceState::GenericRead => D3D12_RESOURCE_STATE_GENERIC_READ,
        ResourceState::VertexAndConstantBuffer => D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER,
        ResourceState::IndexBuffer => D3D12_RESOURCE_STATE_INDEX_BUFFER,
        ResourceState::PixelShaderResource => D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
        ResourceState::RenderTarget => D3D12_RESOURCE_STATE_RENDER_TARGET,
        ResourceState::Present => D3D12_RESOURCE_STATE_PRESENT,
        ResourceState::DepthWrite => D3D12_RESOURCE_STATE_DEPTH_WRITE,
    }
}

fn dxgi_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
    }
}

fn heap_type(heap: HeapKind) -> D3D12_HEAP_TYPE {
    match heap {
        HeapKind::Default => D3D12_HEAP_TYPE_DEFAULT,
        HeapKind::Upload => D3D12_HEAP_TYPE_UPLOAD,
    }
}

fn texture_resource_desc(desc: &TextureDesc) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        Alignment: 0,
        Width: desc.width as u64,
        Height: desc.height,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: dxgi_format(desc.format),
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    }
}

fn transition_barrier(
    resource: &ID3D12Resource,
    state_before: D3D12_RESOURCE_STATES,
    state_after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                StateBefore: state_before,
                StateAfter: state_after,
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            }),
        },
    }
}

fn cpu_handle(heap: &ID3D12DescriptorHeap, index: u32, increment: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
    D3D12_CPU_DESCRIPTOR_HANDLE {
        ptr: unsafe { heap.GetCPUDescriptorHandleForHeapStart() }.ptr
            + (index * increment) as usize,
    }
}

fn set_name(object: &ID3D12Object, name: &str) {
    // Names only show up in debug tooling.
    unsafe { object.SetName(&HSTRING::from(name)) }.ok();
}

/// A committed resource. Depth buffers also own the heap their view lives in.
#[derive(Clone)]
pub struct D3d12Resource {
    pub(crate) resource: ID3D12Resource,
    _view_heap: Option<ID3D12DescriptorHeap>,
}

pub struct D3d12DescriptorHeap {
    heap: ID3D12DescriptorHeap,
    increment: u32,
}

pub struct D3d12Device {
    device: ID3D12Device,
    cbv_srv_increment: u32,
}

impl D3d12Device {
    pub(crate) fn new(device: ID3D12Device) -> Self {
        let cbv_srv_increment = unsafe {
            device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV)
        };
        Self {
            device,
            cbv_srv_increment,
        }
    }

    fn create_committed(
        &self,
        heap: HeapKind,
        desc: &D3D12_RESOURCE_DESC,
        state: ResourceState,
        clear_value: Option<&D3D12_CLEAR_VALUE>,
        name: &str,
    ) -> SandboxResult<ID3D12Resource> {
        let heap_properties = D3D12_HEAP_PROPERTIES {
            Type: heap_type(heap),
            ..Default::default()
        };
        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device.CreateCommittedResource(
                &heap_properties,
                D3D12_HEAP_FLAG_NONE,
                desc,
                d3d12_state(state),
                clear_value.map(|value| value as *const _),
                &mut resource,
            )
        }
        .wrap_err_with(|| format!("creating {name}"))?;
        let resource = resource.ok_or_else(|| eyre!("no resource returned for {name}"))?;
        set_name(&resource, name);
        Ok(resource)
    }
}

impl Device<D3d12Api> for D3d12Device {
    fn create_command_allocator(&self) -> SandboxResult<D3d12CommandAllocator> {
        let allocator = unsafe {
            self.device
                .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
        }?;
        Ok(D3d12CommandAllocator { allocator })
    }

    fn create_command_list(
        &self,
        allocator: &D3d12CommandAllocator,
        pipeline: &ID3D12PipelineState,
    ) -> SandboxResult<D3d12CommandList> {
        let list: ID3D12GraphicsCommandList = unsafe {
            self.device.CreateCommandList(
                0,
                D3D12_COMMAND_LIST_TYPE_DIRECT,
                &allocator.allocator,
                pipeline,
            )
        }?;
        Ok(D3d12CommandList { list })
    }

    fn create_fence(&self, initial_value: u64) -> SandboxResult<D3d12Fence> {
        let fence: ID3D12Fence = unsafe { self.device.CreateFence(initial_value, D3D12_FENCE_FLAG_NONE) }?;
        let event = unsafe { CreateEventA(None, false, false, None) }?;
        if event.is_invalid() {
            return Err(Error::from_win32()).wrap_err("creating the fence event");
        }
        Ok(D3d12Fence { fence, event })
    }

    fn create_buffer(
        &self,
        heap: HeapKind,
        size: u64,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<D3d12Resource> {
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Width: size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            ..Default::default()
        };
        let resource = self.create_committed(heap, &desc, initial_state, None, name)?;
        Ok(D3d12Resource {
            resource,
            _view_heap: None,
        })
    }

    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> SandboxResult<D3d12Resource> {
        let resource = self.create_committed(
            HeapKind::Default,
            &texture_resource_desc(desc),
            initial_state,
            None,
            name,
        )?;
        Ok(D3d12Resource {
            resource,
            _view_heap: None,
        })
    }

    fn create_depth_stencil(
        &self,
        width: u32,
        height: u32,
    ) -> SandboxResult<(D3d12Resource, D3D12_CPU_DESCRIPTOR_HANDLE)> {
        let heap: ID3D12DescriptorHeap = unsafe {
            self.device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: 1,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                ..Default::default()
            })
        }?;

        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: width as u64,
            Height: height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_D32_FLOAT,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
            ..Default::default()
        };
        let clear_value = D3D12_CLEAR_VALUE {
            Format: DXGI_FORMAT_D32_FLOAT,
            Anonymous: D3D12_CLEAR_VALUE_0 {
                DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                    Depth: 1.0,
                    Stencil: 0,
                },
            },
        };
        let resource = self.create_committed(
            HeapKind::Default,
            &desc,
            ResourceState::DepthWrite,
            Some(&clear_value),
            "Depth/Stencil Resource Heap",
        )?;

        let view_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
            Format: DXGI_FORMAT_D32_FLOAT,
            ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
            Flags: D3D12_DSV_FLAG_NONE,
            Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_DSV { MipSlice: 0 },
            },
        };
        let view = unsafe { heap.GetCPUDescriptorHandleForHeapStart() };
        unsafe {
            self.device
                .CreateDepthStencilView(&resource, Some(&view_desc as *const _), view)
        };

        Ok((
            D3d12Resource {
                resource,
                _view_heap: Some(heap),
            },
            view,
        ))
    }

    fn texture_copy_footprint(&self, desc: &TextureDesc) -> CopyFootprint {
        let resource_desc = texture_resource_desc(desc);
        let mut layout = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
        let mut rows = 0u32;
        let mut row_size = 0u64;
        let mut total_bytes = 0u64;
        unsafe {
            self.device.GetCopyableFootprints(
                &resource_desc,
                0,
                1,
                0,
                Some(&mut layout as *mut _),
                Some(&mut rows as *mut _),
                Some(&mut row_size as *mut _),
                Some(&mut total_bytes as *mut _),
            )
        };
        CopyFootprint {
            offset: layout.Offset,
            row_pitch: layout.Footprint.RowPitch,
            row_size,
            rows,
            total_bytes,
            desc: *desc,
        }
    }

    fn map(&self, resource: &D3d12Resource, size: u64) -> SandboxResult<D3d12Mapping> {
        // The CPU never reads these through the mapping.
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        let mut data: *mut std::ffi::c_void = std::ptr::null_mut();
        unsafe {
            resource
                .resource
                .Map(0, Some(&read_range), Some(&mut data))
        }
        .wrap_err("mapping an upload buffer")?;
        if data.is_null() {
            return Err(eyre!("Map returned a null pointer"));
        }
        Ok(D3d12Mapping {
            resource: resource.resource.clone(),
            data: data as *mut u8,
            len: size as usize,
        })
    }

    fn create_descriptor_heap(&self, descriptors: u32, name: &str) -> SandboxResult<D3d12DescriptorHeap> {
        let heap: ID3D12DescriptorHeap = unsafe {
            self.device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: descriptors,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
                ..Default::default()
            })
        }?;
        set_name(&heap, name);
        Ok(D3d12DescriptorHeap {
            heap,
            increment: self.cbv_srv_increment,
        })
    }

    fn write_constant_buffer_view(
        &self,
        heap: &D3d12DescriptorHeap,
        slot: u32,
        buffer: &D3d12Resource,
        size: u32,
    ) {
        let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: unsafe { buffer.resource.GetGPUVirtualAddress() },
            SizeInBytes: size,
        };
        unsafe {
            self.device.CreateConstantBufferView(
                Some(&desc as *const _),
                cpu_handle(&heap.heap, slot, heap.increment),
            )
        };
    }

    fn write_texture_view(
        &self,
        heap: &D3d12DescriptorHeap,
        slot: u32,
        texture: &D3d12Resource,
        desc: &TextureDesc,
    ) {
        let view_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
            Format: dxgi_format(desc.format),
            ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
            Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
            Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_SRV {
                    MostDetailedMip: 0,
                    MipLevels: 1,
                    PlaneSlice: 0,
                    ResourceMinLODClamp: 0.0,
                },
            },
        };
        unsafe {
            self.device.CreateShaderResourceView(
                &texture.resource,
                Some(&view_desc as *const _),
                cpu_handle(&heap.heap, slot, heap.increment),
            )
        };
    }

    fn create_pipeline(
        &self,
        shaders: &ShaderPaths,
    ) -> SandboxResult<(ID3D12RootSignature, ID3D12PipelineState)> {
        let root_signature = create_root_signature(&self.device)?;
        let pipeline_state = create_pipeline_state(&self.device, &root_signature, shaders)?;
        Ok((root_signature, pipeline_state))
    }
}

pub struct D3d12Queue {
    queue: ID3D12CommandQueue,
}

impl D3d12Queue {
    pub(crate) fn new(queue: ID3D12CommandQueue) -> Self {
        Self { queue }
    }
}

impl Queue<D3d12Api> for D3d12Queue {
    fn execute(&self, list: &D3d12CommandList) {
        let lists = [Some(ID3D12CommandList::clone(&list.list))];
        unsafe { self.queue.ExecuteCommandLists(&lists) };
    }

    fn signal(&self, fence: &D3d12Fence, value: u64) -> SandboxResult<()> {
        unsafe { self.queue.Signal(&fence.fence, value) }.map_err(|error| {
            if is_device_lost(&error) {
                GpuError::DeviceLost.into()
            } else {
                eyre::Report::new(error).wrap_err("signaling the frame fence")
            }
        })
    }
}

fn is_device_lost(error: &Error) -> bool {
    let code = error.code();
    code == DXGI_ERROR_DEVICE_REMOVED || code == DXGI_ERROR_DEVICE_RESET
}

pub struct D3d12SwapChain {
    swap_chain: IDXGISwapChain3,
    rtv_heap: ID3D12DescriptorHeap,
    rtv_increment: u32,
    buffer_count: u32,
    fullscreen: bool,
}

impl D3d12SwapChain {
    pub(crate) fn new(
        device: &ID3D12Device,
        swap_chain: IDXGISwapChain3,
        buffer_count: u32,
    ) -> SandboxResult<Self> {
        let rtv_heap: ID3D12DescriptorHeap = unsafe {
            device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: buffer_count,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                ..Default::default()
            })
        }?;
        let rtv_increment =
            unsafe { device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV) };

        for index in 0..buffer_count {
            let buffer: ID3D12Resource = unsafe { swap_chain.GetBuffer(index) }?;
            unsafe {
                device.CreateRenderTargetView(
                    &buffer,
                    None,
                    cpu_handle(&rtv_heap, index, rtv_increment),
                )
            };
        }

        Ok(Self {
            swap_chain,
            rtv_heap,
            rtv_increment,
            buffer_count,
            fullscreen: false,
        })
    }

    pub(crate) fn enter_fullscreen(&mut self) -> SandboxResult<()> {
        unsafe { self.swap_chain.SetFullscreenState(true, None) }
            .wrap_err("entering fullscreen")?;
        self.fullscreen = true;
        Ok(())
    }
}

impl SwapChain<D3d12Api> for D3d12SwapChain {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn current_back_buffer_index(&self) -> u32 {
        unsafe { self.swap_chain.GetCurrentBackBufferIndex() }
    }

    fn back_buffer(&self, index: u32) -> SandboxResult<D3d12Resource> {
        let resource: ID3D12Resource = unsafe { self.swap_chain.GetBuffer(index) }?;
        Ok(D3d12Resource {
            resource,
            _view_heap: None,
        })
    }

    fn render_target_view(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        cpu_handle(&self.rtv_heap, index, self.rtv_increment)
    }

    fn present(&mut self, sync_interval: u32) -> SandboxResult<()> {
        unsafe { self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|error| {
                if is_device_lost(&error) {
                    GpuError::DeviceLost.into()
                } else {
                    eyre::Report::new(error).wrap_err("presenting")
                }
            })
    }

    fn leave_fullscreen(&self) -> SandboxResult<()> {
        if self.fullscreen {
            unsafe { self.swap_chain.SetFullscreenState(false, None) }
                .wrap_err("leaving fullscreen")?;
        }
        Ok(())
    }
}

pub struct D3d12Fence {
    fence: ID3D12Fence,
    event: HANDLE,
}

impl Fence for D3d12Fence {
    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for_value(&self, value: u64) -> SandboxResult<()> {
        if self.completed_value() >= value {
            return Ok(());
        }
        unsafe { self.fence.SetEventOnCompletion(value, self.event) }
            .map_err(|_| GpuError::FenceEventRegistration { value })?;
        unsafe { WaitForSingleObjectEx(self.event, INFINITE, false) };
        Ok(())
    }
}

impl Drop for D3d12Fence {
    fn drop(&mut self) {
        if let Err(error) = unsafe { CloseHandle(self.event) } {
            warn!("Failed to close the fence event: {error}");
        }
    }
}

pub struct D3d12CommandAllocator {
    allocator: ID3D12CommandAllocator,
}

impl CommandAllocator for D3d12CommandAllocator {
    fn reset(&self) -> SandboxResult<()> {
        unsafe { self.allocator.Reset() }.wrap_err("resetting a command allocator")?;
        Ok(())
    }
}

pub struct D3d12CommandList {
    list: ID3D12GraphicsCommandList,
}

impl CommandList<D3d12Api> for D3d12CommandList {
    fn reset(
        &mut self,
        allocator: &D3d12CommandAllocator,
        pipeline: &ID3D12PipelineState,
    ) -> SandboxResult<()> {
        unsafe { self.list.Reset(&allocator.allocator, pipeline) }
            .wrap_err("resetting the command list")?;
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        resource: &D3d12Resource,
        before: ResourceState,
        after: ResourceState,
    ) {
        let barrier = transition_barrier(&resource.resource, d3d12_state(before), d3d12_state(after));
        unsafe { self.list.ResourceBarrier(&[barrier]) };
    }

    fn set_render_target(
        &mut self,
        rtv: D3D12_CPU_DESCRIPTOR_HANDLE,
        dsv: D3D12_CPU_DESCRIPTOR_HANDLE,
    ) {
        unsafe {
            self.list
                .OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv))
        };
    }

    fn clear_render_target(&mut self, rtv: D3D12_CPU_DESCRIPTOR_HANDLE, color: [f32; 4]) {
        unsafe { self.list.ClearRenderTargetView(rtv, &color, None) };
    }

    fn clear_depth(&mut self, dsv: D3D12_CPU_DESCRIPTOR_HANDLE, depth: f32) {
        unsafe {
            self.list
                .ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH, depth, 0, &[])
        };
    }

    fn set_root_signature(&mut self, root_signature: &ID3D12RootSignature) {
        unsafe { self.list.SetGraphicsRootSignature(root_signature) };
    }

    fn set_descriptor_heap(&mut self, heap: &D3d12DescriptorHeap) {
        unsafe { self.list.SetDescriptorHeaps(&[Some(heap.heap.clone())]) };
    }

    fn set_root_descriptor_table(&mut self, parameter: u32, heap: &D3d12DescriptorHeap, slot: u32) {
        let start = unsafe { heap.heap.GetGPUDescriptorHandleForHeapStart() };
        let handle = D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + (slot * heap.increment) as u64,
        };
        unsafe { self.list.SetGraphicsRootDescriptorTable(parameter, handle) };
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        let d3d12_viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: viewport.width as f32,
            Height: viewport.height as f32,
            MinDepth: D3D12_MIN_DEPTH,
            MaxDepth: D3D12_MAX_DEPTH,
        };
        let scissor_rect = RECT {
            left: 0,
            top: 0,
            right: viewport.width as i32,
            bottom: viewport.height as i32,
        };
        unsafe {
            self.list.RSSetViewports(&[d3d12_viewport]);
            self.list.RSSetScissorRects(&[scissor_rect]);
        }
    }

    fn set_vertex_buffer(&mut self, buffer: &D3d12Resource, stride: u32, size: u32) {
        let view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: unsafe { buffer.resource.GetGPUVirtualAddress() },
            StrideInBytes: stride,
            SizeInBytes: size,
        };
        unsafe {
            self.list
                .IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            self.list.IASetVertexBuffers(0, Some(&[view]));
        }
    }

    fn set_index_buffer(&mut self, buffer: &D3d12Resource, size: u32) {
        let view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: unsafe { buffer.resource.GetGPUVirtualAddress() },
            SizeInBytes: size,
            Format: DXGI_FORMAT_R32_UINT,
        };
        unsafe { self.list.IASetIndexBuffer(Some(&view)) };
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe { self.list.DrawIndexedInstanced(index_count, 1, 0, 0, 0) };
    }

    fn copy_buffer(&mut self, dst: &D3d12Resource, src: &D3d12Resource, size: u64) {
        unsafe {
            self.list
                .CopyBufferRegion(&dst.resource, 0, &src.resource, 0, size)
        };
    }

    fn copy_texture(&mut self, dst: &D3d12Resource, src: &D3d12Resource, footprint: &CopyFootprint) {
        let destination = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(&dst.resource) },
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                SubresourceIndex: 0,
            },
        };
        let source = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(&src.resource) },
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                    Offset: footprint.offset,
                    Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                        Format: dxgi_format(footprint.desc.format),
                        Width: footprint.desc.width,
                        Height: footprint.desc.height,
                        Depth: 1,
                        RowPitch: footprint.row_pitch,
                    },
                },
            },
        };
        unsafe {
            self.list
                .CopyTextureRegion(&destination, 0, 0, 0, &source, None)
        };
    }

    fn close(&mut self) -> SandboxResult<()> {
        unsafe { self.list.Close() }.wrap_err("closing the command list")?;
        Ok(())
    }
}

/// A mapped upload-heap resource, unmapped on drop.
pub struct D3d12Mapping {
    resource: ID3D12Resource,
    data: *mut u8,
    len: usize,
}

impl MappedMemory for D3d12Mapping {
    fn len(&self) -> usize {
        self.len
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= self.len, "write past the end of a mapping");
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.data.add(offset), bytes.len()) };
    }

    fn read(&self, offset: usize, out: &mut [u8]) {
        assert!(offset + out.len() <= self.len, "read past the end of a mapping");
        unsafe { std::ptr::copy_nonoverlapping(self.data.add(offset), out.as_mut_ptr(), out.len()) };
    }
}

impl Drop for D3d12Mapping {
    fn drop(&mut self) {
        unsafe { self.resource.Unmap(0, None) };
    }
}
