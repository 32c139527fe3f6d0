use bytemuck::Pod;
use bytemuck::Zeroable;
use eyre::WrapErr;

use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::Device;
use crate::gpu::HeapKind;
use crate::gpu::MappedMemory;
use crate::gpu::ResourceState;

/// Constant buffer views must be sized and placed in 256 byte units.
pub const CONSTANT_BUFFER_ALIGNMENT: u32 = 256;

pub const fn align_to_constant_buffer(size: u32) -> u32 {
    (size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// Per-frame shader constants, laid out to match `cbuffer FrameConstants : register(b0)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    /// Column-major world-view-projection matrix.
    pub world_view_projection: [f32; 16],
    pub color_multiplier: [f32; 4],
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self {
            world_view_projection: bevy_math::Mat4::IDENTITY.to_cols_array(),
            color_multiplier: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// One frame slot's constant buffer: an upload-heap allocation that stays
/// mapped for the whole session and is unmapped when dropped.
pub struct ConstantBufferRegion<A: Api> {
    // Declared before `resource` so the mapping is released first.
    mapping: A::Mapping,
    resource: A::Resource,
    size: u32,
}

impl<A: Api> ConstantBufferRegion<A> {
    pub fn new(device: &A::Device, slot: usize) -> SandboxResult<Self> {
        let size = align_to_constant_buffer(std::mem::size_of::<FrameConstants>() as u32);
        let resource = device
            .create_buffer(
                HeapKind::Upload,
                size as u64,
                ResourceState::GenericRead,
                &format!("Constant Buffer Upload Resource Heap {slot}"),
            )
            .wrap_err_with(|| format!("creating the constant buffer for frame slot {slot}"))?;
        let mut mapping = device
            .map(&resource, size as u64)
            .wrap_err_with(|| format!("mapping the constant buffer for frame slot {slot}"))?;
        mapping.write(0, bytemuck::bytes_of(&FrameConstants::zeroed()));
        Ok(Self {
            mapping,
            resource,
            size,
        })
    }

    pub fn resource(&self) -> &A::Resource {
        &self.resource
    }

    /// Aligned size of the view over this region.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Callers must only write once the owning slot's fence has been observed.
    pub fn write(&mut self, constants: &FrameConstants) {
        self.mapping.write(0, bytemuck::bytes_of(constants));
    }

    pub fn read(&self) -> FrameConstants {
        let mut constants = FrameConstants::zeroed();
        self.mapping
            .read(0, bytemuck::bytes_of_mut(&mut constants));
        constants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_rounds_up_to_256() {
        assert_eq!(align_to_constant_buffer(1), 256);
        assert_eq!(align_to_constant_buffer(80), 256);
        assert_eq!(align_to_constant_buffer(256), 256);
        assert_eq!(align_to_constant_buffer(257), 512);
    }

    #[test]
    fn constants_fit_one_alignment_unit() {
        assert_eq!(std::mem::size_of::<FrameConstants>(), 80);
        assert_eq!(
            align_to_constant_buffer(std::mem::size_of::<FrameConstants>() as u32),
            CONSTANT_BUFFER_ALIGNMENT
        );
    }
}
