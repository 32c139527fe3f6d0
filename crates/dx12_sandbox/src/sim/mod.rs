//! A software GPU that implements [`crate::gpu::Api`] without hardware.
//!
//! The queue is serial and runs lazily: work completes when someone looks at
//! the timeline after the work's deadline, or after [`SimGpu::release`] when
//! paced manually. A validation layer records hazards instead of crashing.

mod objects;
mod timeline;

pub use objects::SimCommandAllocator;
pub use objects::SimCommandList;
pub use objects::SimDescriptorHeap;
pub use objects::SimDevice;
pub use objects::SimFence;
pub use objects::SimMapping;
pub use objects::SimPipelineState;
pub use objects::SimQueue;
pub use objects::SimResource;
pub use objects::SimRootSignature;
pub use objects::SimSwapChain;
pub use objects::SimView;

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use tracing::info;

use crate::gpu::Api;
use crate::gpu::GpuContext;
use crate::gpu::ResourceState;
use timeline::Timeline;

pub struct SimApi;

impl Api for SimApi {
    type Device = SimDevice;
    type Queue = SimQueue;
    type SwapChain = SimSwapChain;
    type Fence = SimFence;
    type CommandAllocator = SimCommandAllocator;
    type CommandList = SimCommandList;
    type Resource = SimResource;
    type Mapping = SimMapping;
    type DescriptorHeap = SimDescriptorHeap;
    type RenderTargetView = SimView;
    type DepthStencilView = SimView;
    type RootSignature = SimRootSignature;
    type PipelineState = SimPipelineState;
}

/// How long the simulated GPU takes to execute a command list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuPacing {
    /// Each list finishes this long after the previous one.
    Delay(Duration),
    /// Lists finish only when [`SimGpu::release`] allows them to.
    Manual,
}

/// Operations that can be made to fail once with [`SimGpu::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePoint {
    AllocatorReset,
    ListReset,
    Close,
    Signal,
    Present,
    /// Registering a fence completion event.
    FenceEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Barrier,
    SetRenderTarget,
    ClearRenderTarget,
    ClearDepth,
    SetRootSignature,
    SetDescriptorHeap,
    SetRootDescriptorTable,
    SetViewport,
    SetVertexBuffer,
    SetIndexBuffer,
    DrawIndexed,
    CopyBuffer,
    CopyTexture,
}

/// A hazard the validation layer caught.
#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    BarrierStateMismatch {
        resource: String,
        recorded: ResourceState,
        actual: ResourceState,
    },
    DrawWithWrongState {
        resource: String,
        required: ResourceState,
        actual: ResourceState,
    },
    AllocatorResetWhileInFlight,
    MappedWriteWhileInFlight {
        resource: String,
    },
    CopyFromReleasedResource {
        resource: String,
    },
    PresentWithWrongState {
        actual: ResourceState,
    },
    ExecuteOpenList,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::BarrierStateMismatch {
                resource,
                recorded,
                actual,
            } => write!(
                f,
                "barrier on {resource} expects {recorded} but it is in {actual}"
            ),
            Violation::DrawWithWrongState {
                resource,
                required,
                actual,
            } => write!(f, "draw needs {resource} in {required} but it is in {actual}"),
            Violation::AllocatorResetWhileInFlight => {
                write!(f, "command allocator reset while the GPU still uses it")
            }
            Violation::MappedWriteWhileInFlight { resource } => {
                write!(f, "CPU wrote {resource} while the GPU still reads it")
            }
            Violation::CopyFromReleasedResource { resource } => {
                write!(f, "copy source {resource} was released before the copy ran")
            }
            Violation::PresentWithWrongState { actual } => {
                write!(f, "presented a back buffer in {actual}")
            }
            Violation::ExecuteOpenList => write!(f, "executed a command list that was not closed"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimStats {
    pub submitted_lists: u64,
    pub executed_lists: u64,
    /// Most lists ever queued but not yet finished at once.
    pub max_in_flight: usize,
    pub list_resets: u64,
    pub presents: u64,
    pub last_submission: Vec<CommandKind>,
}

struct Shared {
    timeline: Mutex<Timeline>,
    progress: Condvar,
}

/// Shared handle to one simulated GPU. Every object it creates holds a clone.
#[derive(Clone)]
pub struct SimGpu {
    shared: Arc<Shared>,
}

impl SimGpu {
    pub fn new(pacing: GpuPacing) -> Self {
        Self {
            shared: Arc::new(Shared {
                timeline: Mutex::new(Timeline::new(pacing)),
                progress: Condvar::new(),
            }),
        }
    }

    /// A GPU that finishes work as soon as it is looked at.
    pub fn immediate() -> Self {
        Self::new(GpuPacing::Delay(Duration::ZERO))
    }

    /// Creates a device, a queue and a swap chain with `buffer_count` back buffers.
    pub fn context(&self, buffer_count: u32, size: (u32, u32)) -> GpuContext<SimApi> {
        info!(
            "Creating software GPU context with {buffer_count} back buffers at {}x{}",
            size.0, size.1
        );
        GpuContext {
            device: SimDevice::new(self.clone()),
            queue: SimQueue::new(self.clone()),
            swap_chain: SimSwapChain::new(self.clone(), buffer_count, size),
        }
    }

    /// Lets `lists` more command lists finish under [`GpuPacing::Manual`].
    pub fn release(&self, lists: u64) {
        self.timeline().release(lists);
        self.notify();
    }

    /// Simulates device removal: queued work is dropped, fences read as
    /// complete and every later queue call fails.
    pub fn lose_device(&self) {
        self.timeline().lose_device();
        self.notify();
    }

    pub fn fail_next(&self, point: FailurePoint) {
        self.timeline().fail_next(point);
    }

    pub fn stats(&self) -> SimStats {
        self.timeline().stats.clone()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.timeline().violations.clone()
    }

    /// Command lists queued but not yet finished.
    pub fn pending_lists(&self) -> usize {
        self.timeline().pending_lists()
    }

    /// State of `resource` on the GPU timeline.
    pub fn resource_state(&self, resource: &SimResource) -> Option<ResourceState> {
        self.timeline()
            .resources
            .get(&resource.id())
            .map(|record| record.state)
    }

    pub fn resource_contents(&self, resource: &SimResource) -> Vec<u8> {
        self.timeline()
            .resources
            .get(&resource.id())
            .map(|record| record.data.clone())
            .unwrap_or_default()
    }

    /// Locks the timeline after running whatever work is due.
    fn timeline(&self) -> MutexGuard<'_, Timeline> {
        let mut timeline = self
            .shared
            .timeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if timeline.advance() {
            self.shared.progress.notify_all();
        }
        timeline
    }

    fn notify(&self) {
        self.shared.progress.notify_all();
    }

    /// Sleeps until the timeline may have progressed, then advances it.
    fn wait_for_progress<'a>(&'a self, timeline: MutexGuard<'a, Timeline>) -> MutexGuard<'a, Timeline> {
        let mut timeline = match timeline.next_deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                self.shared
                    .progress
                    .wait_timeout(timeline, timeout)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => self
                .shared
                .progress
                .wait(timeline)
                .unwrap_or_else(PoisonError::into_inner),
        };
        if timeline.advance() {
            self.shared.progress.notify_all();
        }
        timeline
    }
}
