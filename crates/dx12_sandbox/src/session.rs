use eyre::WrapErr;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::FRAME_COUNT;
use crate::config::SandboxConfig;
use crate::constant_buffer::FrameConstants;
use crate::error::SandboxResult;
use crate::frame::FrameSynchronizer;
use crate::gpu::Api;
use crate::gpu::CommandList;
use crate::gpu::Device;
use crate::gpu::GpuContext;
use crate::gpu::SwapChain;
use crate::gpu::TrackedResource;
use crate::gpu::Viewport;
use crate::gpu::descriptor_slot;
use crate::input::InputAction;
use crate::recorder::FrameTargets;
use crate::recorder::record_frame;
use crate::scene::Camera;
use crate::scene::ColorPulse;
use crate::scene::Mesh;
use crate::scene::MeshData;
use crate::scene::world_view_projection;
use crate::upload::TextureData;
use crate::upload::UploadPipeline;

/// The fixed scene: one mesh and one texture.
pub struct SceneAssets {
    pub mesh: MeshData,
    pub texture: TextureData,
}

impl SceneAssets {
    pub fn load(config: &SandboxConfig) -> SandboxResult<Self> {
        Ok(Self {
            mesh: MeshData::cube(),
            texture: TextureData::load(&config.texture())?,
        })
    }
}

/// Drives update, record, submit and present for one window.
pub struct RenderSession<A: Api, const N: usize = FRAME_COUNT> {
    sync: FrameSynchronizer<A, N>,
    command_list: A::CommandList,
    root_signature: A::RootSignature,
    pipeline: A::PipelineState,
    _depth_stencil: A::Resource,
    depth_stencil_view: A::DepthStencilView,
    mesh: Mesh<A>,
    texture: TrackedResource<A>,
    camera: Camera,
    color_pulse: ColorPulse,
    constants: FrameConstants,
    viewport: Viewport,
    sync_interval: u32,
    frames_rendered: u64,
    running: bool,
    cleaned_up: bool,
    context: GpuContext<A>,
}

impl<A: Api, const N: usize> RenderSession<A, N> {
    /// Builds every per-session GPU object and uploads the scene. Any failure
    /// aborts the whole bootstrap; whatever was created is released on drop.
    pub fn new(
        context: GpuContext<A>,
        config: &SandboxConfig,
        assets: &SceneAssets,
    ) -> SandboxResult<Self> {
        let GpuContext {
            device,
            queue,
            swap_chain,
        } = &context;

        let mut sync = FrameSynchronizer::<A, N>::new(device, swap_chain)
            .wrap_err("creating the frame slots")?;
        let (root_signature, pipeline) = device
            .create_pipeline(&config.shaders())
            .wrap_err("creating the pipeline state")?;
        let (width, height) = config.window_size;
        let (depth_stencil, depth_stencil_view) = device
            .create_depth_stencil(width, height)
            .wrap_err("creating the depth buffer")?;

        let frame_index = swap_chain.current_back_buffer_index() as usize;
        let mut command_list = device
            .create_command_list(&sync.slot(frame_index).allocator, &pipeline)
            .wrap_err("creating the command list")?;
        command_list.close()?;

        sync.begin_recording(frame_index, &mut command_list, &pipeline)?;
        let mut uploads = UploadPipeline::new();
        let mesh = Mesh::upload(device, &mut command_list, &mut uploads, &assets.mesh)
            .wrap_err("uploading the mesh")?;
        let texture = uploads
            .upload_texture(
                device,
                &mut command_list,
                &assets.texture,
                "Texture Buffer Resource Heap",
            )
            .wrap_err("uploading the texture")?;
        if let Err(report) = uploads.finish(&mut sync, frame_index, queue, &mut command_list) {
            // The copies may still be queued; staging goes only once they drain.
            match sync.wait_for_idle(queue) {
                Ok(()) => drop(uploads),
                Err(drain) => {
                    error!("The setup upload never drained: {drain:?}");
                    uploads.abandon();
                }
            }
            return Err(report);
        }

        for slot in sync.slots() {
            device.write_texture_view(
                slot.descriptor_heap(),
                descriptor_slot::TEXTURE,
                texture.resource(),
                &assets.texture.desc,
            );
        }

        info!("Render session ready with {N} frame slots at {width}x{height}");
        Ok(Self {
            sync,
            command_list,
            root_signature,
            pipeline,
            _depth_stencil: depth_stencil,
            depth_stencil_view,
            mesh,
            texture,
            camera: Camera::new(config.aspect_ratio()),
            color_pulse: ColorPulse::default(),
            constants: FrameConstants::default(),
            viewport: Viewport { width, height },
            sync_interval: config.sync_interval,
            frames_rendered: 0,
            running: true,
            cleaned_up: false,
            context,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the animation and stages this frame's constants. They are
    /// copied into the slot's buffer by [`Self::render`] once the slot is free.
    pub fn update(&mut self) {
        let color = self.color_pulse.advance();
        let wvp = world_view_projection(&self.camera, &self.mesh.transform);
        self.constants = FrameConstants {
            world_view_projection: wvp.to_cols_array(),
            color_multiplier: color,
        };
    }

    /// Renders one frame. A failure stops the session instead of propagating.
    pub fn render(&mut self) {
        if !self.running {
            return;
        }
        if let Err(report) = self.try_render() {
            error!("Frame {} failed, stopping: {report:?}", self.frames_rendered);
            self.running = false;
        }
    }

    fn try_render(&mut self) -> SandboxResult<()> {
        let index = self.context.swap_chain.current_back_buffer_index() as usize;

        self.sync.wait_for_slot(index)?;
        self.sync.slot_mut(index).constants.write(&self.constants);
        self.sync
            .begin_recording(index, &mut self.command_list, &self.pipeline)?;

        let slot = self.sync.slot_mut(index);
        record_frame(
            &mut self.command_list,
            FrameTargets {
                render_target: &mut slot.render_target,
                render_target_view: slot.render_target_view,
                depth_stencil_view: self.depth_stencil_view,
                root_signature: &self.root_signature,
                descriptor_heap: &slot.descriptor_heap,
                viewport: self.viewport,
                mesh: &mut self.mesh,
                texture: &mut self.texture,
            },
        )?;

        self.sync
            .submit(index, &self.context.queue, &self.command_list)?;
        self.context
            .swap_chain
            .present(self.sync_interval)
            .wrap_err("presenting")?;
        self.frames_rendered += 1;
        Ok(())
    }

    pub fn apply_input(&mut self, action: InputAction) {
        match action {
            InputAction::MoveForward(delta) => self.move_forward(delta),
            InputAction::MoveRight(delta) => self.move_right(delta),
            InputAction::MoveUp(delta) => self.move_up(delta),
            InputAction::Quit => {
                info!("Quit requested");
                self.running = false;
            }
        }
    }

    pub fn move_forward(&mut self, delta: f32) {
        self.camera.move_forward(delta);
    }

    pub fn move_right(&mut self, delta: f32) {
        self.camera.move_right(delta);
    }

    pub fn move_up(&mut self, delta: f32) {
        self.camera.move_up(delta);
    }

    /// Waits for every slot to drain and leaves fullscreen. Safe to call more
    /// than once; also runs on drop.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.running = false;

        info!(
            "Cleaning up after {} frames, {} in flight",
            self.frames_rendered,
            self.sync.frames_in_flight()
        );
        if let Err(report) = self.sync.wait_for_idle(&self.context.queue) {
            error!("Failed to drain the GPU before teardown: {report:?}");
        }
        if let Err(report) = self.context.swap_chain.leave_fullscreen() {
            warn!("Failed to leave fullscreen: {report:?}");
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn frame_synchronizer(&self) -> &FrameSynchronizer<A, N> {
        &self.sync
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn mesh(&self) -> &Mesh<A> {
        &self.mesh
    }

    pub fn texture(&self) -> &TrackedResource<A> {
        &self.texture
    }

    /// Constants staged by the last [`Self::update`].
    pub fn staged_constants(&self) -> &FrameConstants {
        &self.constants
    }
}

impl<A: Api, const N: usize> Drop for RenderSession<A, N> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
