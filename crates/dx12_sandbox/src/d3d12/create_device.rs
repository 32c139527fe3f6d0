use eyre::WrapErr;
use eyre::eyre;
use tracing::debug;
use tracing::info;
use tracing::warn;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::error::GpuError;
use crate::error::SandboxResult;
use crate::gpu::AdapterInfo;
use crate::gpu::select_hardware_adapter;

/// Creates the DXGI factory and a feature level 11.0 device, enabling the
/// debug layer in debug builds.
pub fn create_device(use_warp_device: bool) -> SandboxResult<(IDXGIFactory4, ID3D12Device)> {
    let mut factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
    if cfg!(debug_assertions) {
        let mut debug: Option<ID3D12Debug> = None;
        match unsafe { D3D12GetDebugInterface(&mut debug) } {
            Ok(()) => {
                if let Some(debug) = debug {
                    unsafe { debug.EnableDebugLayer() };
                    factory_flags |= DXGI_CREATE_FACTORY_DEBUG;
                    info!("D3D12 debug layer enabled");
                }
            }
            Err(error) => warn!("D3D12 debug layer unavailable: {error}"),
        }
    }

    let factory: IDXGIFactory4 =
        unsafe { CreateDXGIFactory2(factory_flags) }.wrap_err("creating the DXGI factory")?;

    let adapter: IDXGIAdapter1 = if use_warp_device {
        info!("Using the WARP adapter");
        unsafe { factory.EnumWarpAdapter() }.wrap_err("getting the WARP adapter")?
    } else {
        get_hardware_adapter(&factory)?
    };

    let mut device: Option<ID3D12Device> = None;
    unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device) }
        .wrap_err("creating the D3D12 device")?;
    let device = device.ok_or_else(|| eyre!("D3D12CreateDevice returned no device"))?;

    Ok((factory, device))
}

fn get_hardware_adapter(factory: &IDXGIFactory4) -> SandboxResult<IDXGIAdapter1> {
    let mut adapters = Vec::new();
    let mut infos = Vec::new();

    for index in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(index) } {
            Ok(adapter) => adapter,
            Err(error) if error.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(error) => return Err(error).wrap_err("enumerating adapters"),
        };

        let desc = unsafe { adapter.GetDesc1() }?;
        let name = String::from_utf16_lossy(&desc.Description)
            .trim_end_matches('\0')
            .to_owned();
        let is_software = (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE)
            != DXGI_ADAPTER_FLAG_NONE;
        // Probe without keeping the device.
        let meets_minimum_feature_level = !is_software
            && unsafe {
                D3D12CreateDevice(
                    &adapter,
                    D3D_FEATURE_LEVEL_11_0,
                    std::ptr::null_mut::<Option<ID3D12Device>>(),
                )
            }
            .is_ok();

        debug!(index, name, is_software, meets_minimum_feature_level, "Found adapter");
        infos.push(AdapterInfo {
            name,
            is_software,
            meets_minimum_feature_level,
        });
        adapters.push(adapter);
    }

    let selected = select_hardware_adapter(&infos).ok_or(GpuError::NoSuitableAdapter)?;
    info!("Selected adapter {}", infos[selected].name);
    Ok(adapters.swap_remove(selected))
}
