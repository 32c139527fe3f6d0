pub mod texture_data;
pub mod upload_pipeline;

pub use texture_data::TextureData;
pub use upload_pipeline::UploadPipeline;
