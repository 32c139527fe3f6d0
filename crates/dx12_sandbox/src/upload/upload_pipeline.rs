use eyre::WrapErr;
use eyre::eyre;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::TextureData;
use crate::error::SandboxResult;
use crate::frame::FrameSynchronizer;
use crate::gpu::Api;
use crate::gpu::CommandList;
use crate::gpu::Device;
use crate::gpu::HeapKind;
use crate::gpu::MappedMemory;
use crate::gpu::ResourceState;
use crate::gpu::TrackedResource;

/// One-shot transfer of static data into device-local memory.
///
/// Copies are recorded into the setup command list. The staging buffers are
/// held here until [`UploadPipeline::finish`] has observed the setup fence.
pub struct UploadPipeline<A: Api> {
    staging: Vec<A::Resource>,
}

impl<A: Api> Default for UploadPipeline<A> {
    fn default() -> Self {
        Self {
            staging: Vec::new(),
        }
    }
}

impl<A: Api> UploadPipeline<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staging resources waiting for the setup list to complete.
    pub fn pending_staging(&self) -> usize {
        self.staging.len()
    }

    pub fn upload_buffer(
        &mut self,
        device: &A::Device,
        list: &mut A::CommandList,
        bytes: &[u8],
        usage: ResourceState,
        name: &str,
    ) -> SandboxResult<TrackedResource<A>> {
        let size = bytes.len() as u64;
        let destination = device
            .create_buffer(HeapKind::Default, size, ResourceState::CopyDest, name)
            .wrap_err_with(|| format!("creating {name}"))?;
        let staging = device
            .create_buffer(
                HeapKind::Upload,
                size,
                ResourceState::GenericRead,
                &format!("{name} Upload"),
            )
            .wrap_err_with(|| format!("creating the staging buffer for {name}"))?;

        {
            let mut mapping = device.map(&staging, size)?;
            mapping.write(0, bytes);
        }

        list.copy_buffer(&destination, &staging, size);
        let mut buffer = TrackedResource::new(destination, size, ResourceState::CopyDest);
        buffer.transition(list, usage);
        self.staging.push(staging);

        debug!("Recorded upload of {size} bytes into {name}");
        Ok(buffer)
    }

    /// Stages `texture` at the device's row pitch and records the copy.
    /// The texture ends in `PixelShaderResource`.
    pub fn upload_texture(
        &mut self,
        device: &A::Device,
        list: &mut A::CommandList,
        texture: &TextureData,
        name: &str,
    ) -> SandboxResult<TrackedResource<A>> {
        let destination = device
            .create_texture(&texture.desc, ResourceState::CopyDest, name)
            .wrap_err_with(|| format!("creating {name}"))?;
        let footprint = device.texture_copy_footprint(&texture.desc);
        let staging = device
            .create_buffer(
                HeapKind::Upload,
                footprint.total_bytes,
                ResourceState::GenericRead,
                &format!("{name} Upload"),
            )
            .wrap_err_with(|| format!("creating the staging buffer for {name}"))?;

        {
            let mut mapping = device.map(&staging, footprint.total_bytes)?;
            for (row, pixels) in texture.rows().enumerate() {
                let offset = footprint.offset as usize + row * footprint.row_pitch as usize;
                mapping.write(offset, pixels);
            }
        }

        list.copy_texture(&destination, &staging, &footprint);
        let mut resource =
            TrackedResource::new(destination, footprint.total_bytes, ResourceState::CopyDest);
        resource.transition(list, ResourceState::PixelShaderResource);
        self.staging.push(staging);

        debug!(
            "Recorded upload of {}x{} texture {name} (row pitch {})",
            texture.desc.width, texture.desc.height, footprint.row_pitch
        );
        Ok(resource)
    }

    /// Closes and submits the setup list on `slot`, waits for it, then
    /// releases the staging buffers.
    ///
    /// If anything fails after the list was handed to the queue, the staging
    /// buffers stay here; see [`Self::release_when_complete`].
    pub fn finish<const N: usize>(
        &mut self,
        sync: &mut FrameSynchronizer<A, N>,
        slot: usize,
        queue: &A::Queue,
        list: &mut A::CommandList,
    ) -> SandboxResult<()> {
        list.close().wrap_err("closing the setup command list")?;
        sync.submit(slot, queue, list)?;
        self.release_when_complete(sync, slot)
    }

    /// Waits for the setup submission on `slot` and releases the staging
    /// buffers. Nothing is released if the wait fails.
    pub fn release_when_complete<const N: usize>(
        &mut self,
        sync: &mut FrameSynchronizer<A, N>,
        slot: usize,
    ) -> SandboxResult<()> {
        sync.wait_for_slot(slot)
            .wrap_err("waiting for the setup command list")?;
        if sync.slot(slot).state().is_in_flight() {
            return Err(eyre!("the setup command list on frame slot {slot} has no fence to wait on"));
        }

        let released = self.staging.len();
        self.staging.clear();
        info!("Uploads complete, released {released} staging buffers");
        Ok(())
    }

    /// Gives up on the staging buffers without releasing them, for when the
    /// GPU can no longer confirm it has finished reading them.
    pub fn abandon(mut self) {
        let leaked = std::mem::take(&mut self.staging);
        warn!("Leaking {} staging buffers the GPU may still read", leaked.len());
        std::mem::forget(leaked);
    }
}
