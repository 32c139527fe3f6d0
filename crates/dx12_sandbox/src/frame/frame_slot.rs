use eyre::WrapErr;

use crate::constant_buffer::ConstantBufferRegion;
use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::Device;
use crate::gpu::ResourceState;
use crate::gpu::SwapChain;
use crate::gpu::TrackedResource;
use crate::gpu::descriptor_slot;

/// Where a slot is in its Idle → Recording → Submitted → Idle cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Owned by the CPU; the allocator may be reset.
    Idle,
    /// The allocator was reset and a command list is recording into it.
    Recording,
    /// On loan to the GPU until `fence_value` is observed.
    Submitted,
    /// The list was executed but signalling `fence_value` after it failed.
    /// Still on loan to the GPU; the fence must be signalled again before
    /// the slot can be waited on.
    Unfenced,
}

impl SlotState {
    /// Whether the GPU may still be using the slot's resources.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SlotState::Submitted | SlotState::Unfenced)
    }
}

/// Everything that belongs to one back buffer. Nothing here may be touched by
/// the CPU while the slot is in flight.
pub struct FrameSlot<A: Api> {
    pub(crate) allocator: A::CommandAllocator,
    pub(crate) fence: A::Fence,
    /// The value the next (or most recent) submission on this slot signals.
    pub(crate) fence_value: u64,
    pub(crate) state: SlotState,
    pub(crate) render_target: TrackedResource<A>,
    pub(crate) render_target_view: A::RenderTargetView,
    pub(crate) constants: ConstantBufferRegion<A>,
    pub(crate) descriptor_heap: A::DescriptorHeap,
}

impl<A: Api> FrameSlot<A> {
    pub fn new(device: &A::Device, swap_chain: &A::SwapChain, index: usize) -> SandboxResult<Self> {
        let allocator = device
            .create_command_allocator()
            .wrap_err_with(|| format!("creating the command allocator for frame slot {index}"))?;
        let fence = device
            .create_fence(0)
            .wrap_err_with(|| format!("creating the fence for frame slot {index}"))?;
        let back_buffer = swap_chain
            .back_buffer(index as u32)
            .wrap_err_with(|| format!("getting back buffer {index}"))?;
        let render_target = TrackedResource::new(back_buffer, 0, ResourceState::Present);
        let render_target_view = swap_chain.render_target_view(index as u32);

        let constants = ConstantBufferRegion::new(device, index)?;
        let descriptor_heap = device
            .create_descriptor_heap(
                descriptor_slot::COUNT,
                &format!("Main Descriptor Heap {index}"),
            )
            .wrap_err_with(|| format!("creating the descriptor heap for frame slot {index}"))?;
        device.write_constant_buffer_view(
            &descriptor_heap,
            descriptor_slot::CONSTANT_BUFFER,
            constants.resource(),
            constants.size(),
        );

        Ok(Self {
            allocator,
            fence,
            fence_value: 1,
            state: SlotState::Idle,
            render_target,
            render_target_view,
            constants,
            descriptor_heap,
        })
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn allocator(&self) -> &A::CommandAllocator {
        &self.allocator
    }

    pub fn fence(&self) -> &A::Fence {
        &self.fence
    }

    pub fn constants(&self) -> &ConstantBufferRegion<A> {
        &self.constants
    }

    pub fn descriptor_heap(&self) -> &A::DescriptorHeap {
        &self.descriptor_heap
    }

    pub fn render_target(&self) -> &TrackedResource<A> {
        &self.render_target
    }
}
