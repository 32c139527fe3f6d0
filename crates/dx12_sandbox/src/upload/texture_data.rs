use std::path::Path;

use eyre::WrapErr;
use eyre::eyre;
use tracing::info;

use crate::error::SandboxResult;
use crate::gpu::TextureDesc;
use crate::gpu::TextureFormat;

/// Decoded pixels ready to be staged, tightly packed RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub desc: TextureDesc,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Decodes an image file. Any source pixel format is converted to RGBA8.
    pub fn load(path: &Path) -> SandboxResult<Self> {
        let image = image::open(path)
            .wrap_err_with(|| format!("decoding texture {}", path.display()))?;
        let source_format = image.color();
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        info!(
            "Loaded texture {} ({width}x{height}, converted from {source_format:?})",
            path.display()
        );
        Self::from_rgba8(width, height, rgba.into_raw())
    }

    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> SandboxResult<Self> {
        let desc = TextureDesc {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
        };
        if width == 0 || height == 0 {
            return Err(eyre!("texture must not be empty, got {width}x{height}"));
        }
        let expected = desc.row_size() as usize * height as usize;
        if pixels.len() != expected {
            return Err(eyre!(
                "expected {expected} bytes of RGBA8 for {width}x{height}, got {}",
                pixels.len()
            ));
        }
        Ok(Self { desc, pixels })
    }

    /// Unpadded pixel rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks_exact(self.desc.row_size() as usize)
    }

    /// A two-colour checkerboard with `cell`-pixel squares.
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> SandboxResult<Self> {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let light = ((x / cell) + (y / cell)) % 2 == 0;
                let value = if light { 0xC8 } else { 0x46 };
                pixels.extend_from_slice(&[value, value, value, 0xFF]);
            }
        }
        Self::from_rgba8(width, height, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_pixel_count_is_rejected() {
        assert!(TextureData::from_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::from_rgba8(0, 2, vec![]).is_err());
    }

    #[test]
    fn rows_are_unpadded() -> eyre::Result<()> {
        let texture = TextureData::checkerboard(3, 2, 1)?;
        let rows: Vec<&[u8]> = texture.rows().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == 12));
        assert_eq!(&rows[0][0..4], &[0xC8, 0xC8, 0xC8, 0xFF]);
        assert_eq!(&rows[0][4..8], &[0x46, 0x46, 0x46, 0xFF]);
        Ok(())
    }

    #[test]
    fn bundled_texture_decodes_to_rgba8() -> eyre::Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/crate.ppm");
        let texture = TextureData::load(&path)?;
        assert_eq!(texture.desc.format, TextureFormat::Rgba8Unorm);
        assert_eq!(
            texture.pixels.len(),
            (texture.desc.width * texture.desc.height * 4) as usize
        );
        // PPM has no alpha channel; conversion makes it opaque.
        assert!(texture.pixels.chunks_exact(4).all(|pixel| pixel[3] == 0xFF));
        Ok(())
    }
}
