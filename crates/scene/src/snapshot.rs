//! PNG input and output.
//!
//! Feature-gated behind `png` (default on) so the WASM build never pulls in
//! the `image` crate. Pixel conversion lives in `windsway_core::pixels`.

use std::path::Path;

use windsway_core::{PixelBuffer, SwayError};

use crate::render::Frame;

/// Decodes any image the `image` crate understands into a sprite buffer.
pub fn load_png(path: &Path) -> Result<PixelBuffer, SwayError> {
    let img = image::open(path)
        .map_err(|e| SwayError::Io(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    PixelBuffer::from_rgba_bytes(w as usize, h as usize, img.as_raw())
}

/// Writes a rendered frame as an RGBA PNG.
///
/// Returns `SwayError::InvalidDimensions` if the frame does not fit `u32`
/// dimensions, or `SwayError::Io` on write failure.
pub fn write_png(frame: &Frame, path: &Path) -> Result<(), SwayError> {
    let w = u32::try_from(frame.width()).map_err(|_| SwayError::InvalidDimensions)?;
    let h = u32::try_from(frame.height()).map_err(|_| SwayError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, frame.to_rgba_bytes())
        .ok_or_else(|| SwayError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path)
        .map_err(|e| SwayError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use windsway_core::{Grid, Rgba8};

    #[test]
    fn write_then_load_keeps_every_pixel() {
        let frame = Grid::from_fn(5, 3, |x, y| {
            Rgba8::new((x * 50) as u8, (y * 80) as u8, 7, if x == 0 { 0 } else { 255 })
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        write_png(&frame, &path).unwrap();
        let back = load_png(&path).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_png(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, SwayError::Io(ref m) if m.contains("nope.png")));
    }

    #[test]
    fn garbage_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_png(&path), Err(SwayError::Io(_))));
    }
}
