//! Decoded source image: a grid of RGBA8 pixels.

use crate::color::Rgba8;
use crate::error::SwayError;
use crate::grid::Grid;

/// The sprite being animated, one [`Rgba8`] per cell.
pub type PixelBuffer = Grid<Rgba8>;

impl Grid<Rgba8> {
    /// Wraps a tightly packed RGBA8 byte buffer (`width * height * 4` bytes).
    ///
    /// Returns `SwayError::InvalidDimensions` for a zero-sized image and
    /// `SwayError::BufferSize` when the byte count does not match.
    pub fn from_rgba_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, SwayError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(SwayError::InvalidDimensions)?;
        if width == 0 || height == 0 {
            return Err(SwayError::InvalidDimensions);
        }
        if bytes.len() != expected {
            return Err(SwayError::BufferSize {
                width,
                height,
                expected,
                got: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| Rgba8::new(px[0], px[1], px[2], px[3]))
            .collect();
        Grid::from_data(width, height, pixels)
    }

    /// Flattens back into a packed RGBA8 byte buffer.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.data()
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_bytes_unpacks_row_major() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let px = PixelBuffer::from_rgba_bytes(3, 1, &bytes).unwrap();
        assert_eq!(px.get(1, 0), Some(&Rgba8::new(5, 6, 7, 8)));
        assert_eq!(px.to_rgba_bytes(), bytes.to_vec());
    }

    #[test]
    fn from_rgba_bytes_rejects_short_buffer() {
        let result = PixelBuffer::from_rgba_bytes(2, 2, &[0; 15]);
        assert!(matches!(
            result,
            Err(SwayError::BufferSize {
                expected: 16,
                got: 15,
                ..
            })
        ));
    }

    #[test]
    fn from_rgba_bytes_rejects_empty_image() {
        assert!(matches!(
            PixelBuffer::from_rgba_bytes(0, 4, &[]),
            Err(SwayError::InvalidDimensions)
        ));
    }
}
