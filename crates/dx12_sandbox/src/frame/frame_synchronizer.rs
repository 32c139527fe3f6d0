use eyre::WrapErr;
use eyre::eyre;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::FrameSlot;
use super::SlotState;
use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::CommandAllocator;
use crate::gpu::CommandList;
use crate::gpu::Fence;
use crate::gpu::Queue;
use crate::gpu::SwapChain;

/// Gates CPU access to the `N` frame slots on each slot's fence.
///
/// Slots are always indexed by the swap chain's current back-buffer index, so
/// no two frames can be recording or in flight against the same slot.
pub struct FrameSynchronizer<A: Api, const N: usize> {
    slots: [FrameSlot<A>; N],
}

impl<A: Api, const N: usize> FrameSynchronizer<A, N> {
    pub fn new(device: &A::Device, swap_chain: &A::SwapChain) -> SandboxResult<Self> {
        if N == 0 {
            return Err(eyre!("at least one frame slot is required"));
        }
        let buffer_count = swap_chain.buffer_count() as usize;
        if buffer_count != N {
            return Err(eyre!(
                "swap chain has {buffer_count} back buffers but {N} frame slots were requested"
            ));
        }

        let slots = array_init::try_array_init(|index| FrameSlot::new(device, swap_chain, index))?;
        info!("Created {N} frame slots");
        Ok(Self { slots })
    }

    pub fn slot(&self, index: usize) -> &FrameSlot<A> {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut FrameSlot<A> {
        &mut self.slots[index]
    }

    pub fn slots(&self) -> &[FrameSlot<A>; N] {
        &self.slots
    }

    /// Number of slots whose work has been submitted but not yet observed complete.
    pub fn frames_in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state.is_in_flight())
            .count()
    }

    /// Blocks until the GPU has finished the last submission that used `index`,
    /// then arms the slot's fence value for its next submission.
    ///
    /// Calling this on a slot that is not `Submitted` does nothing, so repeated
    /// calls advance the fence value at most once per submission.
    pub fn wait_for_slot(&mut self, index: usize) -> SandboxResult<()> {
        let slot = &mut self.slots[index];
        if slot.state != SlotState::Submitted {
            return Ok(());
        }

        let completed = slot.fence.completed_value();
        if completed < slot.fence_value {
            debug!(
                slot = index,
                completed,
                target = slot.fence_value,
                "Waiting for frame slot"
            );
            slot.fence
                .wait_for_value(slot.fence_value)
                .wrap_err_with(|| format!("waiting for frame slot {index}"))?;
        }

        slot.fence_value += 1;
        slot.state = SlotState::Idle;
        Ok(())
    }

    /// Resets the slot's allocator and starts `list` recording into it.
    ///
    /// Only legal once [`Self::wait_for_slot`] has returned for this slot.
    pub fn begin_recording(
        &mut self,
        index: usize,
        list: &mut A::CommandList,
        pipeline: &A::PipelineState,
    ) -> SandboxResult<()> {
        let slot = &mut self.slots[index];
        debug_assert_eq!(
            slot.state,
            SlotState::Idle,
            "frame slot {index} must be idle before its allocator is reset"
        );

        slot.allocator
            .reset()
            .wrap_err_with(|| format!("resetting the command allocator of frame slot {index}"))?;
        list.reset(&slot.allocator, pipeline)
            .wrap_err_with(|| format!("resetting the command list for frame slot {index}"))?;
        slot.state = SlotState::Recording;
        Ok(())
    }

    /// Executes a closed `list` and schedules the slot's fence value after it.
    ///
    /// If the signal fails the list is already queued, so the slot becomes
    /// [`SlotState::Unfenced`] and is drained by [`Self::wait_for_idle`].
    pub fn submit(
        &mut self,
        index: usize,
        queue: &A::Queue,
        list: &A::CommandList,
    ) -> SandboxResult<()> {
        let slot = &mut self.slots[index];
        debug_assert_eq!(
            slot.state,
            SlotState::Recording,
            "frame slot {index} must be recording before it is submitted"
        );

        queue.execute(list);
        if let Err(report) = queue.signal(&slot.fence, slot.fence_value) {
            slot.state = SlotState::Unfenced;
            return Err(report.wrap_err(format!("signalling the fence of frame slot {index}")));
        }
        slot.state = SlotState::Submitted;
        Ok(())
    }

    /// Waits until no slot is in flight. Used before teardown.
    ///
    /// Every slot is attempted even if an earlier one fails. Slots that failed
    /// are retried once after the others have drained; the first error of the
    /// retry is returned.
    pub fn wait_for_idle(&mut self, queue: &A::Queue) -> SandboxResult<()> {
        let mut failed = Vec::new();
        for index in 0..N {
            if let Err(report) = self.drain_slot(index, queue) {
                warn!(slot = index, "Frame slot did not drain, retrying: {report:?}");
                failed.push(index);
            }
        }

        let mut first_error = None;
        for index in failed {
            if let Err(report) = self.drain_slot(index, queue) {
                first_error.get_or_insert(report);
            }
        }
        match first_error {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }

    fn drain_slot(&mut self, index: usize, queue: &A::Queue) -> SandboxResult<()> {
        let slot = &mut self.slots[index];
        if slot.state == SlotState::Unfenced {
            queue
                .signal(&slot.fence, slot.fence_value)
                .wrap_err_with(|| format!("re-signalling the fence of frame slot {index}"))?;
            slot.state = SlotState::Submitted;
        }
        self.wait_for_slot(index)
    }
}
