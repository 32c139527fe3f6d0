//! Staging lifetime and copy layout of the upload pipeline.

use dx12_sandbox::frame::FrameSynchronizer;
use dx12_sandbox::gpu::CommandList;
use dx12_sandbox::gpu::Device;
use dx12_sandbox::gpu::GpuContext;
use dx12_sandbox::gpu::HeapKind;
use dx12_sandbox::gpu::MappedMemory;
use dx12_sandbox::gpu::ResourceState;
use dx12_sandbox::sim::FailurePoint;
use dx12_sandbox::sim::GpuPacing;
use dx12_sandbox::sim::SimApi;
use dx12_sandbox::sim::SimCommandList;
use dx12_sandbox::sim::SimGpu;
use dx12_sandbox::sim::SimPipelineState;
use dx12_sandbox::sim::Violation;
use dx12_sandbox::upload::TextureData;
use dx12_sandbox::upload::UploadPipeline;

struct Setup {
    context: GpuContext<SimApi>,
    sync: FrameSynchronizer<SimApi, 2>,
    list: SimCommandList,
}

/// Two frame slots with a command list recording on slot 0.
fn setup(gpu: &SimGpu) -> eyre::Result<Setup> {
    let context = gpu.context(2, (16, 16));
    let mut sync = FrameSynchronizer::new(&context.device, &context.swap_chain)?;
    let mut list = context
        .device
        .create_command_list(sync.slot(0).allocator(), &SimPipelineState)?;
    list.close()?;
    sync.begin_recording(0, &mut list, &SimPipelineState)?;
    Ok(Setup {
        context,
        sync,
        list,
    })
}

#[test]
fn texture_rows_are_staged_at_the_device_pitch() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    // 3 pixels is 12 bytes per row, well under the 256 byte pitch.
    let texture = TextureData::checkerboard(3, 5, 1)?;
    let footprint = context.device.texture_copy_footprint(&texture.desc);
    assert_eq!(footprint.row_pitch, 256);
    assert_eq!(footprint.row_size, 12);
    assert_eq!(footprint.total_bytes, 256 * 4 + 12);

    let mut uploads = UploadPipeline::new();
    let uploaded = uploads.upload_texture(&context.device, &mut list, &texture, "Checkerboard")?;
    assert_eq!(uploads.pending_staging(), 1);
    uploads.finish(&mut sync, 0, &context.queue, &mut list)?;

    assert_eq!(uploaded.state(), ResourceState::PixelShaderResource);
    assert_eq!(gpu.resource_contents(uploaded.resource()), texture.pixels);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn buffers_end_in_their_usage_state() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    let bytes: Vec<u8> = (0..=255).collect();
    let mut uploads = UploadPipeline::new();
    let buffer = uploads.upload_buffer(
        &context.device,
        &mut list,
        &bytes,
        ResourceState::IndexBuffer,
        "Index Buffer Resource Heap",
    )?;
    uploads.finish(&mut sync, 0, &context.queue, &mut list)?;

    assert_eq!(buffer.size(), 256);
    assert_eq!(gpu.resource_state(buffer.resource()), Some(ResourceState::IndexBuffer));
    assert_eq!(gpu.resource_contents(buffer.resource()), bytes);
    assert_eq!(sync.slot(0).fence_value(), 2);
    Ok(())
}

#[test]
fn releasing_staging_before_the_copy_runs_is_caught() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    let mut uploads = UploadPipeline::<SimApi>::new();
    let _vertices = uploads.upload_buffer(
        &context.device,
        &mut list,
        &[7; 64],
        ResourceState::VertexAndConstantBuffer,
        "Vertex Buffer Resource Heap",
    )?;
    list.close()?;
    sync.submit(0, &context.queue, &list)?;
    // Skips the wait that `finish` would do.
    drop(uploads);

    gpu.release(1);
    sync.wait_for_slot(0)?;

    assert!(matches!(
        gpu.violations().as_slice(),
        [Violation::CopyFromReleasedResource { .. }]
    ));
    Ok(())
}

#[test]
fn writing_a_mapping_the_gpu_still_reads_is_caught() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    let source = context.device.create_buffer(
        HeapKind::Upload,
        32,
        ResourceState::GenericRead,
        "Source",
    )?;
    let destination = context.device.create_buffer(
        HeapKind::Default,
        32,
        ResourceState::CopyDest,
        "Destination",
    )?;
    let mut mapping = context.device.map(&source, 32)?;
    mapping.write(0, &[1; 32]);

    list.copy_buffer(&destination, &source, 32);
    list.close()?;
    sync.submit(0, &context.queue, &list)?;

    mapping.write(0, &[2; 32]);
    assert!(matches!(
        gpu.violations().as_slice(),
        [Violation::MappedWriteWhileInFlight { .. }]
    ));

    gpu.release(1);
    sync.wait_for_slot(0)?;
    mapping.write(0, &[3; 32]);
    assert_eq!(gpu.violations().len(), 1);
    Ok(())
}

#[test]
fn a_failed_setup_wait_keeps_the_staging_alive() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    let mut uploads = UploadPipeline::new();
    let _vertices = uploads.upload_buffer(
        &context.device,
        &mut list,
        &[7; 64],
        ResourceState::VertexAndConstantBuffer,
        "Vertex Buffer Resource Heap",
    )?;
    gpu.fail_next(FailurePoint::FenceEvent);
    assert!(uploads.finish(&mut sync, 0, &context.queue, &mut list).is_err());
    assert_eq!(uploads.pending_staging(), 1);

    gpu.release(1);
    uploads.release_when_complete(&mut sync, 0)?;
    assert_eq!(uploads.pending_staging(), 0);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn staging_is_kept_while_the_setup_list_has_no_fence() -> eyre::Result<()> {
    let gpu = SimGpu::new(GpuPacing::Manual);
    let Setup {
        context,
        mut sync,
        mut list,
    } = setup(&gpu)?;

    let mut uploads = UploadPipeline::new();
    let _indices = uploads.upload_buffer(
        &context.device,
        &mut list,
        &[3; 48],
        ResourceState::IndexBuffer,
        "Index Buffer Resource Heap",
    )?;
    gpu.fail_next(FailurePoint::Signal);
    assert!(uploads.finish(&mut sync, 0, &context.queue, &mut list).is_err());
    assert!(uploads.release_when_complete(&mut sync, 0).is_err());
    assert_eq!(uploads.pending_staging(), 1);

    gpu.release(1);
    sync.wait_for_idle(&context.queue)?;
    uploads.release_when_complete(&mut sync, 0)?;
    assert_eq!(uploads.pending_staging(), 0);
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
    Ok(())
}

#[test]
fn upload_heap_is_the_only_mappable_heap() -> eyre::Result<()> {
    let gpu = SimGpu::immediate();
    let context = gpu.context(1, (8, 8));
    let device_local = context.device.create_buffer(
        HeapKind::Default,
        16,
        ResourceState::CopyDest,
        "Device Local",
    )?;
    assert!(context.device.map(&device_local, 16).is_err());
    Ok(())
}
