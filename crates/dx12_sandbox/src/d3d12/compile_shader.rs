use std::path::Path;

use eyre::eyre;
use tracing::debug;
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::D3D12_SHADER_BYTECODE;
use windows::core::*;

use crate::error::GpuError;
use crate::error::SandboxResult;

/// Compiles the `main` entry point of an HLSL file for `target`.
/// On failure the compiler's diagnostic is carried in the error.
pub fn compile_shader(path: &Path, target: PCSTR) -> SandboxResult<ID3DBlob> {
    let flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        0
    };
    let hlsl_path = HSTRING::from(path);

    let mut shader_blob = None;
    let mut error_blob = None;
    let result = unsafe {
        D3DCompileFromFile(
            &hlsl_path,
            None,
            None,
            s!("main"),
            target,
            flags,
            0,
            &mut shader_blob,
            Some(&mut error_blob),
        )
    };

    if let Err(error) = result {
        let diagnostic = error_blob
            .map(|blob| blob_text(&blob))
            .unwrap_or_else(|| error.to_string());
        return Err(GpuError::ShaderCompilation {
            path: path.display().to_string(),
            diagnostic,
        }
        .into());
    }

    debug!("Compiled {}", path.display());
    shader_blob.ok_or_else(|| eyre!("the compiler returned no bytecode for {}", path.display()))
}

pub fn shader_bytecode(blob: &ID3DBlob) -> D3D12_SHADER_BYTECODE {
    unsafe {
        D3D12_SHADER_BYTECODE {
            pShaderBytecode: blob.GetBufferPointer(),
            BytecodeLength: blob.GetBufferSize(),
        }
    }
}

pub fn blob_text(blob: &ID3DBlob) -> String {
    let bytes = unsafe {
        std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize())
    };
    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_owned()
}
