//! A small Direct3D 12 renderer: one textured cube, triple-buffered frames,
//! and fence-gated reuse of every per-frame resource.

pub mod config;
pub mod constant_buffer;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod recorder;
pub mod scene;
pub mod session;
pub mod sim;
pub mod upload;

#[cfg(windows)]
pub mod d3d12;
#[cfg(windows)]
pub mod window;

/// Back buffers in the swap chain, and frame slots in a session.
pub const FRAME_COUNT: usize = 3;
