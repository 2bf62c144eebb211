//! Two-dimensional row-major grid with bounds-checked addressing.
//!
//! A `Grid<T>` stores `width * height` cells in row-major order. Every grid
//! in a loaded scene (wind, displacement, force, weights, categories) shares
//! the shape of the source image. Unlike a toroidal field, out-of-range
//! coordinates never wrap: lookups return `None` so that callers can drop
//! contributions that fall off the edge.

use glam::DVec2;

use crate::error::SwayError;

/// Grid of 2D vectors: wind, displacement, and force fields.
pub type VectorGrid = Grid<DVec2>;

/// A fixed-size `width x height` grid of cells in row-major layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

fn checked_len(width: usize, height: usize) -> Result<usize, SwayError> {
    if width == 0 || height == 0 {
        return Err(SwayError::InvalidDimensions);
    }
    width
        .checked_mul(height)
        .ok_or(SwayError::InvalidDimensions)
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every cell set to `value`.
    ///
    /// Returns `SwayError::InvalidDimensions` if either dimension is zero
    /// or if `width * height` overflows `usize`.
    pub fn filled(width: usize, height: usize, value: T) -> Result<Self, SwayError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![value; len],
        })
    }

    /// Resets every cell to `value` without reallocating.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a grid with every cell set to `T::default()`.
    pub fn new(width: usize, height: usize) -> Result<Self, SwayError> {
        Self::filled(width, height, T::default())
    }
}

impl<T> Grid<T> {
    /// Builds a grid by calling `f(x, y)` for every cell in row-major order.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Result<Self, SwayError> {
        let len = checked_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a grid from a pre-built row-major vector, validating that
    /// `data.len() == width * height`.
    pub fn from_data(width: usize, height: usize, data: Vec<T>) -> Result<Self, SwayError> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(SwayError::DimensionMismatch {
                lhs_w: width,
                lhs_h: height,
                rhs_w: data.len(),
                rhs_h: 1,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: grids are never empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only access to the row-major cells.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the row-major cells.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Flat index of `(x, y)`, or `None` when the coordinate is off the grid.
    pub fn index(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Cell at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: isize, y: isize) -> Option<&T> {
        self.index(x, y).map(|i| &self.data[i])
    }

    /// Mutable cell at `(x, y)`, or `None` when out of bounds.
    pub fn get_mut(&mut self, x: isize, y: isize) -> Option<&mut T> {
        self.index(x, y).map(move |i| &mut self.data[i])
    }

    /// Cell enclosing a continuous position, truncating each coordinate
    /// towards negative infinity. Non-finite or off-grid positions yield `None`.
    pub fn sample(&self, pos: DVec2) -> Option<&T> {
        if !pos.is_finite() {
            return None;
        }
        let cell = pos.floor();
        self.get(cell.x as isize, cell.y as isize)
    }

    /// True when `other` has the same width and height.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Returns `SwayError::DimensionMismatch` unless `other` has the same shape.
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<(), SwayError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(SwayError::DimensionMismatch {
                lhs_w: self.width,
                lhs_h: self.height,
                rhs_w: other.width,
                rhs_h: other.height,
            })
        }
    }

    /// Iterates over all cells yielding `(x, y, &value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % w, i / w, v))
    }

    /// Builds a same-shaped grid by mapping every cell.
    pub fn map<U>(&self, mut f: impl FnMut(usize, usize, &T) -> U) -> Grid<U> {
        let w = self.width;
        Grid {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(i, v)| f(i % w, i / w, v))
                .collect(),
        }
    }
}

impl Grid<DVec2> {
    /// Sum of vector norms ("total wind power").
    pub fn total_power(&self) -> f64 {
        self.data.iter().map(|v| v.length()).sum()
    }

    /// Sum of squared vector norms.
    pub fn energy(&self) -> f64 {
        self.data.iter().map(|v| v.length_squared()).sum()
    }

    /// True when no component of any cell is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
