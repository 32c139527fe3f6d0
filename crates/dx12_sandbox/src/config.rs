use std::path::Path;
use std::path::PathBuf;

use eyre::WrapErr;
use eyre::eyre;
use tracing::warn;

use crate::error::SandboxResult;

/// Settings for one run of the sandbox, built from the process arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct SandboxConfig {
    pub use_warp_device: bool,
    pub fullscreen: bool,
    /// First argument to `Present`. 0 renders as fast as the GPU allows.
    pub sync_interval: u32,
    pub window_size: (u32, u32),
    pub title: String,
    pub shader_dir: PathBuf,
    pub texture_path: PathBuf,
    /// Run this many frames against the software GPU instead of opening a window.
    pub headless_frames: Option<u32>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            use_warp_device: false,
            fullscreen: false,
            sync_interval: 0,
            window_size: (1280, 720),
            title: "DX12 Sandbox".into(),
            shader_dir: PathBuf::from("shaders"),
            texture_path: PathBuf::from("assets").join("crate.ppm"),
            headless_frames: None,
        }
    }
}

impl SandboxConfig {
    /// Parses `-warp`, `--fullscreen`, `--vsync`, `--width N`, `--height N`,
    /// `--texture PATH`, `--shaders DIR` and `--headless FRAMES`.
    /// The first item is the program name and is skipped.
    pub fn from_args<I>(args: I) -> SandboxResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = SandboxConfig::default();
        let mut args = args.into_iter().skip(1);

        while let Some(arg) = args.next() {
            if arg.eq_ignore_ascii_case("-warp") || arg.eq_ignore_ascii_case("/warp") {
                config.use_warp_device = true;
            } else if arg == "--fullscreen" {
                config.fullscreen = true;
            } else if arg == "--vsync" {
                config.sync_interval = 1;
            } else if arg == "--width" {
                config.window_size.0 = parse_number(&arg, args.next())?;
            } else if arg == "--height" {
                config.window_size.1 = parse_number(&arg, args.next())?;
            } else if arg == "--texture" {
                config.texture_path = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| eyre!("--texture expects a path"))?;
            } else if arg == "--shaders" {
                config.shader_dir = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| eyre!("--shaders expects a directory"))?;
            } else if arg == "--headless" {
                config.headless_frames = Some(parse_number(&arg, args.next())?);
            } else {
                warn!("Ignoring unknown argument {arg:?}");
            }
        }

        if config.window_size.0 == 0 || config.window_size.1 == 0 {
            return Err(eyre!(
                "window size must be non-zero, got {}x{}",
                config.window_size.0,
                config.window_size.1
            ));
        }

        Ok(config)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.window_size.0 as f32 / self.window_size.1 as f32
    }

    pub fn shaders(&self) -> ShaderPaths {
        let dir = resolve_asset(&self.shader_dir);
        ShaderPaths {
            vertex: dir.join("VertexShader.hlsl"),
            pixel: dir.join("PixelShader.hlsl"),
        }
    }

    pub fn texture(&self) -> PathBuf {
        resolve_asset(&self.texture_path)
    }
}

/// The two HLSL sources compiled at startup. Both use the entry point `main`.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub pixel: PathBuf,
}

fn parse_number(flag: &str, value: Option<String>) -> SandboxResult<u32> {
    let value = value.ok_or_else(|| eyre!("{flag} expects a number"))?;
    value
        .parse()
        .wrap_err_with(|| format!("{flag} expects a number, got {value:?}"))
}

/// Finds an asset next to the executable, falling back to the crate directory
/// (useful during development).
pub fn resolve_asset(relative: &Path) -> PathBuf {
    if relative.is_absolute() {
        return relative.to_path_buf();
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let candidate = exe_dir.join(relative);
        if candidate.exists() {
            return candidate;
        }
    }

    let fallback = Path::new(env!("CARGO_MANIFEST_DIR")).join(relative);
    if fallback.exists() {
        warn!(
            "{} not found next to executable, using {}",
            relative.display(),
            fallback.display()
        );
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("dx12_sandbox")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_open_a_1280_by_720_window() -> eyre::Result<()> {
        let config = SandboxConfig::from_args(args(&[]))?;
        assert_eq!(config.window_size, (1280, 720));
        assert_eq!(config.sync_interval, 0);
        assert!(!config.use_warp_device);
        assert!(config.headless_frames.is_none());
        Ok(())
    }

    #[test]
    fn warp_flag_is_case_insensitive() -> eyre::Result<()> {
        assert!(SandboxConfig::from_args(args(&["/WARP"]))?.use_warp_device);
        assert!(SandboxConfig::from_args(args(&["-warp"]))?.use_warp_device);
        Ok(())
    }

    #[test]
    fn numeric_flags_are_parsed() -> eyre::Result<()> {
        let config = SandboxConfig::from_args(args(&[
            "--width", "800", "--height", "600", "--headless", "12", "--vsync",
        ]))?;
        assert_eq!(config.window_size, (800, 600));
        assert_eq!(config.headless_frames, Some(12));
        assert_eq!(config.sync_interval, 1);
        Ok(())
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(SandboxConfig::from_args(args(&["--width", "wide"])).is_err());
        assert!(SandboxConfig::from_args(args(&["--height"])).is_err());
        assert!(SandboxConfig::from_args(args(&["--width", "0"])).is_err());
    }

    #[test]
    fn shader_paths_use_fixed_file_names() {
        let shaders = SandboxConfig::default().shaders();
        assert!(shaders.vertex.ends_with("shaders/VertexShader.hlsl"));
        assert!(shaders.pixel.ends_with("shaders/PixelShader.hlsl"));
    }
}
