/// The usage mode a GPU resource is in. Every change is an explicit barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    CopyDest,
    GenericRead,
    VertexAndConstantBuffer,
    IndexBuffer,
    PixelShaderResource,
    RenderTarget,
    Present,
    DepthWrite,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
