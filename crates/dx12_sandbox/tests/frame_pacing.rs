//! Frame slot reuse and CPU/GPU overlap against the software GPU.

mod common;

use std::time::Duration;

use dx12_sandbox::frame::FrameSynchronizer;
use dx12_sandbox::frame::SlotState;
use dx12_sandbox::gpu::CommandList;
use dx12_sandbox::gpu::Device;
use dx12_sandbox::sim::FailurePoint;
use dx12_sandbox::sim::GpuPacing;
use dx12_sandbox::sim::SimApi;
use dx12_sandbox::sim::SimGpu;
use dx12_sandbox::sim::SimPipelineState;

#[test]
fn cpu_blocks_once_every_slot_is_in_flight() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    // Lets the setup list through.
    gpu.release(1);
    let mut session = common::start_session::<3>(&gpu)?;

    let renderer = std::thread::spawn(move || {
        common::render_frames(&mut session, 5);
        session
    });

    // Setup plus three frames recorded, then the fourth waits on slot 0.
    common::wait_until(|| gpu.stats().list_resets == 4);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(gpu.stats().list_resets, 4);
    assert_eq!(gpu.pending_lists(), 3);

    gpu.release(16);
    let session = renderer.join().expect("render thread panicked");
    assert_eq!(session.frames_rendered(), 5);
    assert!(session.is_running());
    drop(session);

    let stats = gpu.stats();
    assert_eq!(stats.max_in_flight, 3);
    assert_eq!(stats.executed_lists, 6);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn a_thousand_frames_never_exceed_the_slot_count() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Delay(Duration::from_micros(20)));
    let mut session = common::start_session::<3>(&gpu)?;

    for _ in 0..1000 {
        session.update();
        session.render();
        assert!(session.frame_synchronizer().frames_in_flight() <= 3);
    }
    assert!(session.is_running());
    assert_eq!(session.frames_rendered(), 1000);

    session.cleanup();
    assert_eq!(session.frame_synchronizer().frames_in_flight(), 0);

    let stats = gpu.stats();
    assert!(stats.max_in_flight <= 3);
    assert_eq!(stats.presents, 1000);
    assert_eq!(stats.submitted_lists, 1001);
    assert_eq!(stats.executed_lists, 1001);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn a_single_slot_serializes_cpu_and_gpu() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Delay(Duration::from_micros(50)));
    let mut session = common::start_session::<1>(&gpu)?;

    common::render_frames(&mut session, 50);

    assert_eq!(session.frames_rendered(), 50);
    assert_eq!(gpu.stats().max_in_flight, 1);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn fence_values_advance_once_per_submission() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let context = gpu.context(2, (16, 16));
    let mut sync = FrameSynchronizer::<SimApi, 2>::new(&context.device, &context.swap_chain)?;
    assert!(sync.slots().iter().all(|slot| slot.fence_value() == 1));

    let mut list = context
        .device
        .create_command_list(sync.slot(0).allocator(), &SimPipelineState)?;
    list.close()?;

    sync.begin_recording(0, &mut list, &SimPipelineState)?;
    assert_eq!(sync.slot(0).state(), SlotState::Recording);
    list.close()?;
    sync.submit(0, &context.queue, &list)?;
    assert_eq!(sync.slot(0).state(), SlotState::Submitted);
    assert_eq!(sync.frames_in_flight(), 1);

    sync.wait_for_slot(0)?;
    assert_eq!(sync.slot(0).state(), SlotState::Idle);
    assert_eq!(sync.slot(0).fence_value(), 2);

    sync.wait_for_slot(0)?;
    sync.wait_for_slot(1)?;
    assert_eq!(sync.slot(0).fence_value(), 2);
    assert_eq!(sync.slot(1).fence_value(), 1);
    Ok(())
}

#[test]
fn a_failed_signal_leaves_the_slot_in_flight_until_drained() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let context = gpu.context(2, (16, 16));
    let mut sync = FrameSynchronizer::<SimApi, 2>::new(&context.device, &context.swap_chain)?;
    let mut list = context
        .device
        .create_command_list(sync.slot(0).allocator(), &SimPipelineState)?;
    list.close()?;

    sync.begin_recording(0, &mut list, &SimPipelineState)?;
    list.close()?;
    gpu.fail_next(FailurePoint::Signal);
    assert!(sync.submit(0, &context.queue, &list).is_err());
    assert_eq!(sync.slot(0).state(), SlotState::Unfenced);
    assert_eq!(sync.frames_in_flight(), 1);

    // Waiting alone cannot observe a fence that was never signalled.
    sync.wait_for_slot(0)?;
    assert_eq!(sync.slot(0).state(), SlotState::Unfenced);

    sync.wait_for_idle(&context.queue)?;
    assert_eq!(sync.slot(0).state(), SlotState::Idle);
    assert_eq!(sync.slot(0).fence_value(), 2);
    assert_eq!(sync.frames_in_flight(), 0);
    Ok(())
}

#[test]
fn slot_count_must_match_the_swap_chain() {
    let gpu = SimGpu::immediate();
    let context = gpu.context(2, (16, 16));
    assert!(FrameSynchronizer::<SimApi, 3>::new(&context.device, &context.swap_chain).is_err());

    let empty = gpu.context(0, (16, 16));
    assert!(FrameSynchronizer::<SimApi, 0>::new(&empty.device, &empty.swap_chain).is_err());
}
