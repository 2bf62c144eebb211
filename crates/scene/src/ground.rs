//! Decorative ground strip drawn under the sprite.
//!
//! A column-by-column random walk of terrain height. The chance of a height
//! change ramps up every column and resets after each change, so the strip
//! has long flat runs broken by single-step slopes.

use windsway_core::{Grid, Rgba8, SwayError, Xorshift64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroundTile {
    #[default]
    Empty,
    GrassLight,
    GrassDark,
    DirtLight,
    DirtDark,
}

impl GroundTile {
    pub fn color(self) -> Rgba8 {
        match self {
            GroundTile::Empty => Rgba8::TRANSPARENT,
            GroundTile::GrassLight => Rgba8::opaque(0x91, 0xd9, 0x66),
            GroundTile::GrassDark => Rgba8::opaque(0x86, 0xca, 0x5c),
            GroundTile::DirtLight => Rgba8::opaque(0xe3, 0xbd, 0xaa),
            GroundTile::DirtDark => Rgba8::opaque(0xcc, 0xa6, 0x93),
        }
    }
}

/// Builds a `max_height` × `width` strip; row `max_height - 1` is the bottom.
///
/// Each column holds one grass tile on top of `height - 1` dirt tiles. Dirt
/// is dark with probability `0.6^(depth)` where depth counts from just under
/// the grass, so the layer beneath the grass is always dark.
pub fn generate_ground(
    width: usize,
    min_height: usize,
    max_height: usize,
    rng: &mut Xorshift64,
) -> Result<Grid<GroundTile>, SwayError> {
    if min_height == 0 || min_height > max_height {
        return Err(SwayError::InvalidConfig(format!(
            "ground heights must satisfy 1 <= min <= max, got {min_height}..{max_height}"
        )));
    }
    let mut ground: Grid<GroundTile> = Grid::new(width, max_height)?;
    let mut height = ((min_height + max_height) as f64 / 2.0).round() as usize;
    let mut change_chance = 0.0;

    for x in 0..width {
        change_chance += (1.0 - change_chance) / 50.0;
        if rng.chance(change_chance) {
            height = if height == min_height {
                height + 1
            } else if height == max_height {
                height - 1
            } else if rng.coin() {
                height + 1
            } else {
                height - 1
            };
            height = height.clamp(min_height, max_height);
            change_chance = 0.0;
        }

        let grass = if x % 2 == 1 {
            GroundTile::GrassLight
        } else {
            GroundTile::GrassDark
        };
        ground.data_mut()[(max_height - height) * width + x] = grass;
        for i in 0..height - 1 {
            let depth = (height - 2 - i) as i32;
            let tile = if rng.chance(0.6_f64.powi(depth)) {
                GroundTile::DirtDark
            } else {
                GroundTile::DirtLight
            };
            ground.data_mut()[(max_height - 1 - i) * width + x] = tile;
        }
    }
    Ok(ground)
}
