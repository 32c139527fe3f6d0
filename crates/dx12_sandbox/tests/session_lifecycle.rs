//! Bootstrap, per-frame recording, input and failure handling of a session.

mod common;

use std::path::PathBuf;

use dx12_sandbox::config::SandboxConfig;
use dx12_sandbox::gpu::ResourceState;
use dx12_sandbox::input::InputAction;
use dx12_sandbox::scene::camera::CAMERA_SPEED;
use dx12_sandbox::scene::camera::START_POSITION;
use dx12_sandbox::session::RenderSession;
use dx12_sandbox::sim::CommandKind;
use dx12_sandbox::sim::FailurePoint;
use dx12_sandbox::sim::GpuPacing;
use dx12_sandbox::sim::SimApi;
use dx12_sandbox::sim::SimGpu;

#[test]
fn bootstrap_uploads_the_scene_and_leaves_nothing_in_flight() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let session = common::start_session::<3>(&gpu)?;

    assert_eq!(session.frames_rendered(), 0);
    assert_eq!(session.frame_synchronizer().frames_in_flight(), 0);
    assert_eq!(gpu.stats().executed_lists, 1);
    assert_eq!(gpu.pending_lists(), 0);

    let mesh = session.mesh();
    assert_eq!(mesh.index_count(), 36);
    assert_eq!(
        gpu.resource_state(mesh.vertex_buffer().resource()),
        Some(ResourceState::VertexAndConstantBuffer)
    );
    assert_eq!(
        gpu.resource_state(mesh.index_buffer().resource()),
        Some(ResourceState::IndexBuffer)
    );
    assert_eq!(
        gpu.resource_state(session.texture().resource()),
        Some(ResourceState::PixelShaderResource)
    );

    let texture = common::test_assets()?.texture;
    assert_eq!(gpu.resource_contents(session.texture().resource()), texture.pixels);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn frames_record_in_a_fixed_order() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let mut session = common::start_session::<3>(&gpu)?;

    common::render_frames(&mut session, 2);

    assert_eq!(
        gpu.stats().last_submission,
        vec![
            CommandKind::Barrier,
            CommandKind::SetRenderTarget,
            CommandKind::ClearRenderTarget,
            CommandKind::ClearDepth,
            CommandKind::SetRootSignature,
            CommandKind::SetDescriptorHeap,
            CommandKind::SetRootDescriptorTable,
            CommandKind::SetRootDescriptorTable,
            CommandKind::SetViewport,
            CommandKind::SetVertexBuffer,
            CommandKind::SetIndexBuffer,
            CommandKind::DrawIndexed,
            CommandKind::Barrier,
        ]
    );

    session.cleanup();
    for slot in session.frame_synchronizer().slots() {
        assert_eq!(
            gpu.resource_state(slot.render_target().resource()),
            Some(ResourceState::Present)
        );
    }
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn each_slot_receives_the_constants_staged_for_its_frame() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let mut session = common::start_session::<3>(&gpu)?;

    for frame in 0..6 {
        session.update();
        let staged = *session.staged_constants();
        session.render();

        let slot = session.frame_synchronizer().slot(frame % 3);
        assert_eq!(slot.constants().read(), staged);
    }

    // The pulse has moved away from its starting color.
    let color = session.staged_constants().color_multiplier;
    assert!(color[0] > 0.0 && color[1] > 0.0 && color[2] > 0.0);
    assert_eq!(color[3], 1.0);
    Ok(())
}

#[test]
fn movement_changes_the_projected_cube() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let mut session = common::start_session::<3>(&gpu)?;

    session.update();
    let before = session.staged_constants().world_view_projection;

    session.apply_input(InputAction::MoveForward(1.0));
    session.update();
    let after = session.staged_constants().world_view_projection;

    let position = session.camera().transform().position();
    assert!((position.z - (START_POSITION.z + CAMERA_SPEED)).abs() < 1e-6);
    assert_ne!(before, after);
    assert!(session.is_running());
    Ok(())
}

#[test]
fn quit_stops_rendering() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let mut session = common::start_session::<3>(&gpu)?;

    common::render_frames(&mut session, 1);
    session.apply_input(InputAction::Quit);
    common::render_frames(&mut session, 3);

    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 1);
    Ok(())
}

#[test]
fn device_loss_ends_the_session_without_hanging() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    gpu.release(4);
    let mut session = common::start_session::<3>(&gpu)?;

    common::render_frames(&mut session, 3);
    gpu.lose_device();
    common::render_frames(&mut session, 3);

    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 3);
    // Teardown must not wait for work the lost device will never finish.
    session.cleanup();
    Ok(())
}

#[test]
fn a_failing_frame_stops_the_session() -> eyre::Result<()> {
    for point in [
        FailurePoint::AllocatorReset,
        FailurePoint::ListReset,
        FailurePoint::Close,
        FailurePoint::Signal,
        FailurePoint::Present,
    ] {
        let gpu = SimGpu::immediate();
        let mut session = common::start_session::<3>(&gpu)?;

        common::render_frames(&mut session, 2);
        gpu.fail_next(point);
        common::render_frames(&mut session, 3);

        assert!(!session.is_running(), "{point:?} did not stop the session");
        assert_eq!(session.frames_rendered(), 2, "{point:?}");
    }
    Ok(())
}

#[test]
fn a_failed_fence_wait_stops_the_session() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    gpu.release(1);
    let mut session = common::start_session::<3>(&gpu)?;

    // Three frames fill every slot; the fourth has to wait.
    common::render_frames(&mut session, 3);
    gpu.fail_next(FailurePoint::FenceEvent);
    common::render_frames(&mut session, 1);

    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 3);

    gpu.release(3);
    session.cleanup();
    assert_eq!(session.frame_synchronizer().frames_in_flight(), 0);
    Ok(())
}

#[test]
fn cleanup_is_idempotent() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let mut session = common::start_session::<3>(&gpu)?;

    common::render_frames(&mut session, 4);
    session.cleanup();
    session.cleanup();
    common::render_frames(&mut session, 1);

    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 4);
    assert_eq!(gpu.pending_lists(), 0);
    Ok(())
}

#[test]
fn missing_shaders_fail_the_bootstrap() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let config = SandboxConfig {
        shader_dir: PathBuf::from("no-such-shader-dir"),
        ..common::test_config()
    };
    let context = gpu.context(3, config.window_size);

    let result = RenderSession::<SimApi>::new(context, &config, &common::test_assets()?);

    assert!(result.is_err());
    assert_eq!(gpu.stats().submitted_lists, 0);
    Ok(())
}

#[test]
fn a_shader_without_an_entry_point_fails_the_bootstrap() -> eyre::Result<()> {
    let shader_dir = std::env::temp_dir().join(format!("dx12_sandbox_shaders_{}", std::process::id()));
    std::fs::create_dir_all(&shader_dir)?;
    std::fs::write(shader_dir.join("VertexShader.hlsl"), "float4 vs_entry() : SV_POSITION { return 0; }")?;
    std::fs::write(shader_dir.join("PixelShader.hlsl"), "float4 main() : SV_TARGET { return 1; }")?;

    let gpu = SimGpu::immediate();
    let config = SandboxConfig {
        shader_dir: shader_dir.clone(),
        ..common::test_config()
    };
    let context = gpu.context(3, config.window_size);
    let result = RenderSession::<SimApi>::new(context, &config, &common::test_assets()?);
    std::fs::remove_dir_all(&shader_dir)?;

    let report = match result {
        Ok(_) => panic!("bootstrap succeeded without a vertex entry point"),
        Err(report) => report,
    };
    assert!(format!("{report:#}").contains("VertexShader.hlsl"));
    Ok(())
}

#[test]
fn a_failed_setup_wait_drains_the_uploads_before_failing() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    gpu.fail_next(FailurePoint::FenceEvent);
    let releaser = common::release_later(&gpu, 1);

    let result = common::start_session::<3>(&gpu);
    releaser.join().expect("release thread panicked");

    assert!(result.is_err());
    assert_eq!(gpu.pending_lists(), 0);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn cleanup_drains_every_slot_when_one_wait_fails() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    gpu.release(1);
    let mut session = common::start_session::<3>(&gpu)?;

    common::render_frames(&mut session, 3);
    assert_eq!(session.frame_synchronizer().frames_in_flight(), 3);

    gpu.fail_next(FailurePoint::FenceEvent);
    let releaser = common::release_later(&gpu, 3);
    session.cleanup();
    releaser.join().expect("release thread panicked");

    assert_eq!(session.frame_synchronizer().frames_in_flight(), 0);
    assert_eq!(gpu.pending_lists(), 0);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn a_list_whose_signal_failed_is_drained_at_cleanup() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    gpu.release(1);
    let mut session = common::start_session::<3>(&gpu)?;

    gpu.fail_next(FailurePoint::Signal);
    common::render_frames(&mut session, 1);
    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 0);
    assert_eq!(session.frame_synchronizer().frames_in_flight(), 1);
    assert_eq!(gpu.pending_lists(), 1);

    let releaser = common::release_later(&gpu, 1);
    session.cleanup();
    releaser.join().expect("release thread panicked");

    assert_eq!(session.frame_synchronizer().frames_in_flight(), 0);
    assert_eq!(gpu.pending_lists(), 0);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}
