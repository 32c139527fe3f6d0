use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::warn;

use super::CommandKind;
use super::FailurePoint;
use super::GpuPacing;
use super::SimStats;
use super::Violation;
use crate::gpu::CopyFootprint;
use crate::gpu::HeapKind;
use crate::gpu::ResourceState;
use crate::gpu::root_parameter;

/// A recorded command. Resources are referred to by id so that a list never
/// keeps a resource alive on its own, the same as a real command list.
#[derive(Clone, Debug)]
pub(crate) enum Command {
    Barrier {
        resource: u64,
        before: ResourceState,
        after: ResourceState,
    },
    SetRenderTarget {
        render_target: u64,
    },
    ClearRenderTarget,
    ClearDepth,
    SetRootSignature,
    SetDescriptorHeap,
    SetRootDescriptorTable {
        parameter: u32,
        heap: u64,
        slot: u32,
    },
    SetViewport,
    SetVertexBuffer {
        resource: u64,
    },
    SetIndexBuffer {
        resource: u64,
    },
    DrawIndexed,
    CopyBuffer {
        dst: u64,
        src: u64,
        size: u64,
    },
    CopyTexture {
        dst: u64,
        src: u64,
        footprint: CopyFootprint,
    },
}

impl Command {
    pub(crate) fn kind(&self) -> CommandKind {
        match self {
            Command::Barrier { .. } => CommandKind::Barrier,
            Command::SetRenderTarget { .. } => CommandKind::SetRenderTarget,
            Command::ClearRenderTarget => CommandKind::ClearRenderTarget,
            Command::ClearDepth => CommandKind::ClearDepth,
            Command::SetRootSignature => CommandKind::SetRootSignature,
            Command::SetDescriptorHeap => CommandKind::SetDescriptorHeap,
            Command::SetRootDescriptorTable { .. } => CommandKind::SetRootDescriptorTable,
            Command::SetViewport => CommandKind::SetViewport,
            Command::SetVertexBuffer { .. } => CommandKind::SetVertexBuffer,
            Command::SetIndexBuffer { .. } => CommandKind::SetIndexBuffer,
            Command::DrawIndexed => CommandKind::DrawIndexed,
            Command::CopyBuffer { .. } => CommandKind::CopyBuffer,
            Command::CopyTexture { .. } => CommandKind::CopyTexture,
        }
    }

    fn resources(&self) -> impl Iterator<Item = u64> {
        let (first, second) = match *self {
            Command::Barrier { resource, .. }
            | Command::SetVertexBuffer { resource }
            | Command::SetIndexBuffer { resource } => (Some(resource), None),
            Command::SetRenderTarget { render_target } => (Some(render_target), None),
            Command::CopyBuffer { dst, src, .. } | Command::CopyTexture { dst, src, .. } => {
                (Some(dst), Some(src))
            }
            _ => (None, None),
        };
        first.into_iter().chain(second)
    }
}

pub(crate) struct ResourceRecord {
    pub name: String,
    pub heap: HeapKind,
    pub state: ResourceState,
    pub data: Vec<u8>,
    pub released: bool,
}

pub(crate) struct Submission {
    pub allocator: u64,
    pub commands: Vec<Command>,
    pub referenced: HashSet<u64>,
    pub ready_at: Instant,
}

pub(crate) enum QueueOp {
    Execute(Submission),
    Signal { fence: Arc<AtomicU64>, value: u64 },
    Present { back_buffer: u64 },
}

/// Bindings in effect while one list executes.
#[derive(Default)]
struct Bindings {
    render_target: Option<u64>,
    vertex_buffer: Option<u64>,
    index_buffer: Option<u64>,
    texture: Option<u64>,
}

/// Everything the simulated GPU knows, guarded by one mutex.
pub(crate) struct Timeline {
    pacing: GpuPacing,
    queue: VecDeque<QueueOp>,
    gpu_free_at: Instant,
    released: u64,
    pub device_lost: bool,
    failures: Vec<FailurePoint>,
    pub violations: Vec<Violation>,
    pub stats: SimStats,
    next_id: u64,
    pub resources: HashMap<u64, ResourceRecord>,
    pub heaps: HashMap<u64, Vec<Option<u64>>>,
}

impl Timeline {
    pub fn new(pacing: GpuPacing) -> Self {
        Self {
            pacing,
            queue: VecDeque::new(),
            gpu_free_at: Instant::now(),
            released: 0,
            device_lost: false,
            failures: Vec::new(),
            violations: Vec::new(),
            stats: SimStats::default(),
            next_id: 1,
            resources: HashMap::new(),
            heaps: HashMap::new(),
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_resource(&mut self, name: &str, heap: HeapKind, state: ResourceState, size: u64) -> u64 {
        let id = self.next_id();
        self.resources.insert(
            id,
            ResourceRecord {
                name: name.to_owned(),
                heap,
                state,
                data: vec![0; size as usize],
                released: false,
            },
        );
        id
    }

    pub fn release_resource(&mut self, id: u64) {
        if let Some(record) = self.resources.get_mut(&id) {
            record.released = true;
            record.data = Vec::new();
        }
    }

    pub fn resource_name(&self, id: u64) -> String {
        self.resources
            .get(&id)
            .map(|record| record.name.clone())
            .unwrap_or_else(|| format!("resource {id}"))
    }

    pub fn fail_next(&mut self, point: FailurePoint) {
        self.failures.push(point);
    }

    /// Consumes a pending injected failure for `point`, if any.
    pub fn take_failure(&mut self, point: FailurePoint) -> bool {
        match self.failures.iter().position(|pending| *pending == point) {
            Some(position) => {
                self.failures.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, lists: u64) {
        self.released += lists;
    }

    pub fn lose_device(&mut self) {
        self.device_lost = true;
        self.queue.clear();
    }

    pub fn pending_lists(&self) -> usize {
        self.queue
            .iter()
            .filter(|op| matches!(op, QueueOp::Execute(_)))
            .count()
    }

    /// Whether a list that has not finished executing uses `resource`.
    pub fn in_flight_uses_resource(&self, resource: u64) -> bool {
        self.queue.iter().any(
            |op| matches!(op, QueueOp::Execute(submission) if submission.referenced.contains(&resource)),
        )
    }

    pub fn in_flight_uses_allocator(&self, allocator: u64) -> bool {
        self.queue.iter().any(
            |op| matches!(op, QueueOp::Execute(submission) if submission.allocator == allocator),
        )
    }

    pub fn submit(&mut self, allocator: u64, commands: Vec<Command>) {
        let mut referenced = HashSet::new();
        for command in &commands {
            referenced.extend(command.resources());
            if let Command::SetRootDescriptorTable { heap, .. } = command {
                if let Some(slots) = self.heaps.get(heap) {
                    referenced.extend(slots.iter().flatten().copied());
                }
            }
        }

        let delay = match self.pacing {
            GpuPacing::Delay(delay) => delay,
            GpuPacing::Manual => Default::default(),
        };
        let ready_at = self.gpu_free_at.max(Instant::now()) + delay;
        self.gpu_free_at = ready_at;

        self.stats.submitted_lists += 1;
        self.stats.last_submission = commands.iter().map(Command::kind).collect();
        self.queue.push_back(QueueOp::Execute(Submission {
            allocator,
            commands,
            referenced,
            ready_at,
        }));
        self.stats.max_in_flight = self.stats.max_in_flight.max(self.pending_lists());
    }

    pub fn signal(&mut self, fence: Arc<AtomicU64>, value: u64) {
        self.queue.push_back(QueueOp::Signal { fence, value });
    }

    pub fn present(&mut self, back_buffer: u64) {
        self.stats.presents += 1;
        self.queue.push_back(QueueOp::Present { back_buffer });
    }

    /// When the front of the queue can next make progress on its own.
    /// `None` means only an outside event (a release or device loss) can.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.pacing, self.queue.front()) {
            (GpuPacing::Delay(_), Some(QueueOp::Execute(submission))) => Some(submission.ready_at),
            _ => None,
        }
    }

    fn front_is_ready(&self, now: Instant) -> bool {
        match self.queue.front() {
            None => false,
            Some(QueueOp::Execute(submission)) => match self.pacing {
                GpuPacing::Delay(_) => now >= submission.ready_at,
                GpuPacing::Manual => self.released > 0,
            },
            Some(QueueOp::Signal { .. }) | Some(QueueOp::Present { .. }) => true,
        }
    }

    /// Runs every queue operation the GPU would have finished by now.
    /// Returns whether anything completed.
    pub fn advance(&mut self) -> bool {
        let now = Instant::now();
        let mut progressed = false;
        while self.front_is_ready(now) {
            let Some(op) = self.queue.pop_front() else {
                break;
            };
            match op {
                QueueOp::Execute(submission) => {
                    if matches!(self.pacing, GpuPacing::Manual) {
                        self.released -= 1;
                    }
                    self.execute(submission);
                    self.stats.executed_lists += 1;
                }
                QueueOp::Signal { fence, value } => fence.store(value, Ordering::SeqCst),
                QueueOp::Present { back_buffer } => self.check_present(back_buffer),
            }
            progressed = true;
        }
        progressed
    }

    pub fn violation(&mut self, violation: Violation) {
        warn!("GPU validation: {violation}");
        self.violations.push(violation);
    }

    fn execute(&mut self, submission: Submission) {
        let mut bindings = Bindings::default();
        for command in submission.commands {
            match command {
                Command::Barrier {
                    resource,
                    before,
                    after,
                } => self.barrier(resource, before, after),
                Command::SetRenderTarget { render_target } => {
                    bindings.render_target = Some(render_target)
                }
                Command::SetVertexBuffer { resource } => bindings.vertex_buffer = Some(resource),
                Command::SetIndexBuffer { resource } => bindings.index_buffer = Some(resource),
                Command::SetRootDescriptorTable {
                    parameter,
                    heap,
                    slot,
                } if parameter == root_parameter::TEXTURE => {
                    bindings.texture = self
                        .heaps
                        .get(&heap)
                        .and_then(|slots| slots.get(slot as usize))
                        .copied()
                        .flatten();
                }
                Command::DrawIndexed => self.check_draw(&bindings),
                Command::CopyBuffer { dst, src, size } => {
                    if self.check_copy_source(src) {
                        self.copy_buffer(dst, src, size as usize);
                    }
                }
                Command::CopyTexture {
                    dst,
                    src,
                    footprint,
                } => {
                    if self.check_copy_source(src) {
                        self.copy_texture(dst, src, &footprint);
                    }
                }
                _ => {}
            }
        }
    }

    fn barrier(&mut self, resource: u64, before: ResourceState, after: ResourceState) {
        let Some(record) = self.resources.get_mut(&resource) else {
            return;
        };
        let actual = record.state;
        record.state = after;
        if actual != before {
            let resource = self.resource_name(resource);
            self.violation(Violation::BarrierStateMismatch {
                resource,
                recorded: before,
                actual,
            });
        }
    }

    fn check_draw(&mut self, bindings: &Bindings) {
        let bound = [
            (bindings.render_target, ResourceState::RenderTarget),
            (bindings.vertex_buffer, ResourceState::VertexAndConstantBuffer),
            (bindings.index_buffer, ResourceState::IndexBuffer),
            (bindings.texture, ResourceState::PixelShaderResource),
        ];
        for (resource, required) in bound {
            let Some(resource) = resource else {
                continue;
            };
            let Some(actual) = self.resources.get(&resource).map(|record| record.state) else {
                continue;
            };
            if actual != required {
                let resource = self.resource_name(resource);
                self.violation(Violation::DrawWithWrongState {
                    resource,
                    required,
                    actual,
                });
            }
        }
    }

    fn check_copy_source(&mut self, src: u64) -> bool {
        let released = self
            .resources
            .get(&src)
            .is_none_or(|record| record.released);
        if released {
            let resource = self.resource_name(src);
            self.violation(Violation::CopyFromReleasedResource { resource });
        }
        !released
    }

    fn copy_buffer(&mut self, dst: u64, src: u64, size: usize) {
        let Some(bytes) = self
            .resources
            .get(&src)
            .map(|record| record.data[..size.min(record.data.len())].to_vec())
        else {
            return;
        };
        if let Some(record) = self.resources.get_mut(&dst) {
            let len = bytes.len().min(record.data.len());
            record.data[..len].copy_from_slice(&bytes[..len]);
        }
    }

    fn copy_texture(&mut self, dst: u64, src: u64, footprint: &CopyFootprint) {
        let row_size = footprint.row_size as usize;
        let Some(rows) = self.resources.get(&src).map(|record| {
            (0..footprint.rows as usize)
                .map(|row| {
                    let start = footprint.offset as usize + row * footprint.row_pitch as usize;
                    record.data[start..start + row_size].to_vec()
                })
                .collect::<Vec<_>>()
        }) else {
            return;
        };
        if let Some(record) = self.resources.get_mut(&dst) {
            for (row, bytes) in rows.iter().enumerate() {
                let start = row * row_size;
                record.data[start..start + row_size].copy_from_slice(bytes);
            }
        }
    }

    fn check_present(&mut self, back_buffer: u64) {
        let Some(actual) = self.resources.get(&back_buffer).map(|record| record.state) else {
            return;
        };
        if actual != ResourceState::Present {
            self.violation(Violation::PresentWithWrongState { actual });
        }
    }
}
