//! Scripted pointer for headless renders: sweeps back and forth across the
//! sprite at mid height, with a Perlin wobble so the gust is not a ruler line.

use glam::DVec2;
use noise::{NoiseFn, Perlin};
use windsway_scene::Projector;

pub struct PointerScript {
    noise: Perlin,
    sweeps: f64,
    wobble: f64,
}

impl PointerScript {
    /// `sweeps` is the number of one-way passes over the whole run; `wobble`
    /// the vertical amplitude as a fraction of the sprite height.
    pub fn new(seed: u32, sweeps: f64, wobble: f64) -> Self {
        Self {
            noise: Perlin::new(seed),
            sweeps: sweeps.max(0.0),
            wobble,
        }
    }

    /// Screen position at run progress `t` in `[0, 1]`.
    pub fn position(&self, t: f64, projector: &Projector, sprite: (usize, usize)) -> DVec2 {
        let (w, h) = (sprite.0 as f64, sprite.1 as f64);
        let phase = (t * self.sweeps).rem_euclid(2.0);
        let across = if phase <= 1.0 { phase } else { 2.0 - phase };
        let x = -0.25 * w + across * 1.5 * w;
        let y = 0.5 * h + self.noise.get([t * 4.0, 0.5]) * self.wobble * h;
        projector.to_screen(DVec2::new(x, y))
    }
}
