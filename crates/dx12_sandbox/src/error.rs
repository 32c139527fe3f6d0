pub type SandboxResult<T, E = eyre::Report> = core::result::Result<T, E>;

/// Device-level conditions that end a render session.
pub enum GpuError {
    /// The device was removed or reset; no further GPU calls can succeed.
    DeviceLost,
    /// A fence completion event could not be registered.
    FenceEventRegistration { value: u64 },
    /// No adapter passed the hardware and feature-level checks.
    NoSuitableAdapter,
    /// A shader failed to compile; carries the compiler diagnostic.
    ShaderCompilation { path: String, diagnostic: String },
    /// An operation was injected to fail by the software GPU.
    Injected(&'static str),
}

impl std::error::Error for GpuError {}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::DeviceLost => write!(f, "the GPU device was removed or lost"),
            GpuError::FenceEventRegistration { value } => {
                write!(f, "failed to register a completion event for fence value {value}")
            }
            GpuError::NoSuitableAdapter => {
                write!(f, "no hardware adapter supports feature level 11.0")
            }
            GpuError::ShaderCompilation { path, diagnostic } => {
                write!(f, "failed to compile {path}: {diagnostic}")
            }
            GpuError::Injected(operation) => write!(f, "injected failure in {operation}"),
        }
    }
}

impl std::fmt::Debug for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
