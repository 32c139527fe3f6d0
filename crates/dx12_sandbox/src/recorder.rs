use eyre::WrapErr;

use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::CommandList;
use crate::gpu::ResourceState;
use crate::gpu::TrackedResource;
use crate::gpu::Viewport;
use crate::gpu::descriptor_slot;
use crate::gpu::root_parameter;
use crate::scene::Mesh;

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.2, 0.4, 1.0];
pub const CLEAR_DEPTH: f32 = 1.0;

/// What one frame draws into and with.
pub struct FrameTargets<'a, A: Api> {
    pub render_target: &'a mut TrackedResource<A>,
    pub render_target_view: A::RenderTargetView,
    pub depth_stencil_view: A::DepthStencilView,
    pub root_signature: &'a A::RootSignature,
    pub descriptor_heap: &'a A::DescriptorHeap,
    pub viewport: Viewport,
    pub mesh: &'a mut Mesh<A>,
    pub texture: &'a mut TrackedResource<A>,
}

/// Records the frame into a list that was just reset against the slot's
/// allocator, and closes it.
pub fn record_frame<A: Api>(
    list: &mut A::CommandList,
    targets: FrameTargets<'_, A>,
) -> SandboxResult<()> {
    let FrameTargets {
        render_target,
        render_target_view,
        depth_stencil_view,
        root_signature,
        descriptor_heap,
        viewport,
        mesh,
        texture,
    } = targets;

    render_target.transition(list, ResourceState::RenderTarget);

    list.set_render_target(render_target_view, depth_stencil_view);
    list.clear_render_target(render_target_view, CLEAR_COLOR);
    list.clear_depth(depth_stencil_view, CLEAR_DEPTH);

    list.set_root_signature(root_signature);
    list.set_descriptor_heap(descriptor_heap);
    list.set_root_descriptor_table(
        root_parameter::CONSTANTS,
        descriptor_heap,
        descriptor_slot::CONSTANT_BUFFER,
    );
    texture.transition(list, ResourceState::PixelShaderResource);
    list.set_root_descriptor_table(root_parameter::TEXTURE, descriptor_heap, descriptor_slot::TEXTURE);
    list.set_viewport(viewport);
    mesh.bind(list);

    list.draw_indexed(mesh.index_count());

    render_target.transition(list, ResourceState::Present);

    // A list that fails to close cannot be executed.
    list.close().wrap_err("closing the frame command list")
}
