//! Grid ↔ canvas coordinate mapping.
//!
//! The sprite is scaled by an integer unit size, centered horizontally and
//! rests on the bottom edge of the canvas. Grid row 0 is the top of the
//! sprite; screen y grows downwards as well.

use glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    canvas: DVec2,
    image: DVec2,
    unit: f64,
}

impl Projector {
    pub fn new(
        canvas_width: usize,
        canvas_height: usize,
        image_width: usize,
        image_height: usize,
    ) -> Self {
        let canvas = DVec2::new(canvas_width as f64, canvas_height as f64);
        let image = DVec2::new(image_width as f64, image_height as f64);
        let longest = image.max_element().max(1.0);
        let unit = (0.9 * canvas.min_element() / longest).floor().max(1.0);
        Self {
            canvas,
            image,
            unit,
        }
    }

    /// Screen pixels per grid cell, at least 1.
    pub fn unit(&self) -> f64 {
        self.unit
    }

    pub fn canvas_size(&self) -> (usize, usize) {
        (self.canvas.x as usize, self.canvas.y as usize)
    }

    /// Screen position of the top-left corner of the sprite.
    pub fn origin(&self) -> DVec2 {
        DVec2::new(
            ((self.canvas.x / 2.0).floor() - self.unit * self.image.x / 2.0).floor(),
            self.canvas.y - self.image.y * self.unit,
        )
    }

    pub fn to_screen(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            (self.canvas.x / 2.0 + self.unit * (p.x - self.image.x / 2.0)).floor(),
            self.canvas.y - self.unit * (self.image.y - p.y),
        )
    }

    pub fn to_grid(&self, s: DVec2) -> DVec2 {
        (s - self.origin()) / self.unit
    }
}
