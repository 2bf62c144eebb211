//! CPU rasterizer: draws a [`Simulation`] into an RGBA8 frame the size of
//! the canvas.
//!
//! Layers, back to front: background, ground strip, the sprite at rest, the
//! sprite displaced by the spring field, particles, and the optional wind
//! arrow overlay. Everything is composited with straight alpha.

use glam::DVec2;
use windsway_core::color::blend_over;
use windsway_core::{Grid, PixelBuffer, PixelCategory, Rgba8, SwayError, VectorGrid};
use windsway_particles::Particle;

use crate::config::{GroundAnchor, RenderParams};
use crate::ground::GroundTile;
use crate::projector::Projector;
use crate::simulation::Simulation;

/// A rendered canvas, one RGBA8 value per screen pixel.
pub type Frame = PixelBuffer;

const STATIC_LIGHTEN: f64 = 1.02;
const ARROW_MIN_POWER: f64 = 0.05;
const ARROW_HEAD_ANGLE: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    params: RenderParams,
}

impl Rasterizer {
    pub fn new(params: RenderParams) -> Self {
        Self { params }
    }

    pub fn render_params(&self) -> &RenderParams {
        &self.params
    }

    /// Renders into a freshly allocated frame.
    pub fn render(&self, sim: &Simulation) -> Result<Frame, SwayError> {
        let (cw, ch) = sim.projector().canvas_size();
        let mut frame = Grid::filled(cw, ch, self.params.background)?;
        self.draw(sim, &mut frame)?;
        Ok(frame)
    }

    /// Renders into `frame`, reallocating only when the canvas size changed.
    pub fn render_into(&self, sim: &Simulation, frame: &mut Frame) -> Result<(), SwayError> {
        let (cw, ch) = sim.projector().canvas_size();
        if frame.width() == cw && frame.height() == ch {
            frame.fill(self.params.background);
        } else {
            *frame = Grid::filled(cw, ch, self.params.background)?;
        }
        self.draw(sim, frame)
    }

    fn draw(&self, sim: &Simulation, frame: &mut Frame) -> Result<(), SwayError> {
        let projector = sim.projector();
        if let Some(ground) = sim.ground() {
            draw_ground(
                frame,
                projector,
                ground,
                sim.config().ground.anchor,
                (sim.pixels().width(), sim.pixels().height()),
            );
        }
        let categories = sim.classification()?.categories();
        draw_sprite_at_rest(frame, projector, sim.pixels(), categories);
        draw_sprite_displaced(
            frame,
            projector,
            sim.pixels(),
            categories,
            sim.displacement(),
            sim.force(),
        );
        draw_particles(frame, projector, sim.particles());
        if self.params.wind_arrows {
            draw_wind_arrows(frame, projector, sim.wind());
        }
        Ok(())
    }
}

/// Fills the screen pixels whose centers fall inside the square at `pos`
/// (top-left) with side `size`. Off-canvas parts are clipped.
fn fill_square(frame: &mut Frame, pos: DVec2, size: f64, color: Rgba8) {
    if color.a == 0 || size <= 0.0 || !pos.is_finite() {
        return;
    }
    let (w, h) = (frame.width() as f64, frame.height() as f64);
    let x0 = (pos.x - 0.5).ceil().clamp(0.0, w) as usize;
    let x1 = (pos.x + size - 0.5).ceil().clamp(0.0, w) as usize;
    let y0 = (pos.y - 0.5).ceil().clamp(0.0, h) as usize;
    let y1 = (pos.y + size - 0.5).ceil().clamp(0.0, h) as usize;
    let stride = frame.width();
    let data = frame.data_mut();
    for y in y0..y1 {
        for px in &mut data[y * stride + x0..y * stride + x1] {
            *px = blend_over(*px, color);
        }
    }
}

fn plot(frame: &mut Frame, p: DVec2, color: Rgba8) {
    let (x, y) = (p.x.floor(), p.y.floor());
    if x < 0.0 || y < 0.0 {
        return;
    }
    if let Some(px) = frame.get_mut(x as isize, y as isize) {
        *px = blend_over(*px, color);
    }
}

fn draw_line(frame: &mut Frame, from: DVec2, to: DVec2, color: Rgba8) {
    let delta = to - from;
    let steps = delta.abs().max_element().ceil().max(1.0);
    if !steps.is_finite() {
        return;
    }
    let steps = steps as usize;
    for k in 0..=steps {
        plot(frame, from + delta * (k as f64 / steps as f64), color);
    }
}

/// Draws the strip with its bottom row level with the sprite's bottom row.
fn draw_ground(
    frame: &mut Frame,
    projector: &Projector,
    ground: &Grid<GroundTile>,
    anchor: GroundAnchor,
    (sprite_width, sprite_height): (usize, usize),
) {
    let half_strip = (ground.width() / 2) as f64;
    let x_offset = match anchor {
        GroundAnchor::Centered => sprite_width as f64 / 2.0 - half_strip,
        GroundAnchor::LeftEdge => -half_strip,
    };
    let y_offset = sprite_height as f64 - ground.height() as f64;
    for (x, y, tile) in ground.iter() {
        let cell = DVec2::new(x as f64 + x_offset, y as f64 + y_offset);
        fill_square(frame, projector.to_screen(cell), projector.unit(), tile.color());
    }
}

/// Cells of `categories` in draw order, category by category.
fn cells_in_draw_order(
    categories: &Grid<PixelCategory>,
) -> impl Iterator<Item = (usize, usize)> + '_ {
    PixelCategory::ALL.into_iter().flat_map(move |category| {
        categories
            .iter()
            .filter(move |(_, _, c)| **c == category)
            .map(|(x, y, _)| (x, y))
    })
}

/// The undisplaced sprite, slightly lightened, so displaced pixels never
/// leave holes behind them. Pure white pixels are skipped.
fn draw_sprite_at_rest(
    frame: &mut Frame,
    projector: &Projector,
    pixels: &PixelBuffer,
    categories: &Grid<PixelCategory>,
) {
    let width = pixels.width();
    for (x, y) in cells_in_draw_order(categories) {
        let mut hsl = pixels.data()[y * width + x].to_hsla();
        if hsl.a == 0.0 || hsl.l == 1.0 {
            continue;
        }
        hsl.l = (hsl.l * STATIC_LIGHTEN).min(1.0);
        let pos = projector.to_screen(DVec2::new(x as f64, y as f64));
        fill_square(frame, pos, projector.unit(), hsl.to_rgba8());
    }
}

/// The sprite offset by its displacement; pixels under strong force glow.
fn draw_sprite_displaced(
    frame: &mut Frame,
    projector: &Projector,
    pixels: &PixelBuffer,
    categories: &Grid<PixelCategory>,
    displacement: &VectorGrid,
    force: &VectorGrid,
) {
    let width = pixels.width();
    let unit = projector.unit();
    for (x, y) in cells_in_draw_order(categories) {
        let i = y * width + x;
        let mut hsl = pixels.data()[i].to_hsla();
        if hsl.a == 0.0 {
            continue;
        }
        hsl.l = (hsl.l + force.data()[i].length().powf(1.0 / 8.0) / 15.0).min(1.0);
        let pos = projector.to_screen(DVec2::new(x as f64, y as f64))
            + displacement.data()[i] * unit;
        fill_square(frame, pos, unit, hsl.to_rgba8());
    }
}

fn draw_particles(frame: &mut Frame, projector: &Projector, particles: &[Particle]) {
    for particle in particles {
        fill_square(
            frame,
            projector.to_screen(particle.position),
            projector.unit() * particle.size(),
            particle.color().to_rgba8(),
        );
    }
}

/// One arrow per cell with wind power of at least 0.05, colored from blue
/// (weak) to red (strong).
fn draw_wind_arrows(frame: &mut Frame, projector: &Projector, wind: &VectorGrid) {
    for (x, y, dir) in wind.iter() {
        let power = dir.length();
        if power < ARROW_MIN_POWER {
            continue;
        }
        let p = power.min(1.0);
        let color = Rgba8::opaque((255.0 * p).round() as u8, 0, (255.0 * (1.0 - p)).round() as u8);
        let center = projector.to_screen(DVec2::new(x as f64 + 0.5, y as f64 + 0.5));
        let size = projector.unit() * power * 2.0;
        let angle = dir.y.atan2(dir.x);

        let half = DVec2::from_angle(angle) * (size / 2.0);
        let tip = center + half;
        draw_line(frame, center - half, tip, color);
        for barb in [angle + ARROW_HEAD_ANGLE, angle - ARROW_HEAD_ANGLE] {
            draw_line(frame, tip, tip - DVec2::from_angle(barb) * (size / 3.0), color);
        }
    }
}
