//! Pixel classification: semantic category and physical weight per pixel.
//!
//! Each pixel of the sprite is sorted into a [`PixelCategory`] by a fixed
//! first-match list of color rules, then given a weight (inverse
//! responsiveness to wind). Both grids are computed once per image load and
//! memoized in a [`PixelClassifier`] until [`PixelClassifier::invalidate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Rgba8;
use crate::grid::Grid;
use crate::pixels::PixelBuffer;

/// Semantic class of a sprite pixel. Declaration order is draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelCategory {
    #[default]
    Empty,
    Trunk,
    Leaf,
    Hat,
    Eyes,
    Cheek,
    Mouth,
}

impl PixelCategory {
    /// Every category, in the order the renderer draws them.
    pub const ALL: [PixelCategory; 7] = [
        PixelCategory::Empty,
        PixelCategory::Trunk,
        PixelCategory::Leaf,
        PixelCategory::Hat,
        PixelCategory::Eyes,
        PixelCategory::Cheek,
        PixelCategory::Mouth,
    ];

    /// Position in the draw order, 0 for empty.
    pub fn draw_order(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PixelCategory::Empty => "empty",
            PixelCategory::Trunk => "trunk",
            PixelCategory::Leaf => "leaf",
            PixelCategory::Hat => "hat",
            PixelCategory::Eyes => "eyes",
            PixelCategory::Cheek => "cheek",
            PixelCategory::Mouth => "mouth",
        }
    }
}

/// Fixed weights of the non-leaf categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub trunk: f64,
    pub hat: f64,
    pub eyes: f64,
    pub cheek: f64,
    pub mouth: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            trunk: 60.0,
            hat: 35.0,
            eyes: 999.0,
            cheek: 12.0,
            mouth: 60.0,
        }
    }
}

/// Color rules and weight constants of the classifier.
///
/// Deserializes from a partial JSON object; every missing field keeps its
/// default. Colors are hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Hat pixels only occur in rows `0..=hat_row_cutoff`.
    pub hat_row_cutoff: usize,
    pub hat_hue: f64,
    pub hat_hue_tolerance: f64,
    /// Exact RGB matches (opaque pixels only) classified as eyes.
    pub eye_colors: Vec<Rgba8>,
    pub cheek_hue: f64,
    pub mouth_hue: f64,
    pub leaf_hue: f64,
    pub leaf_hue_tolerance: f64,
    pub weights: CategoryWeights,
    pub leaf_base_weight: f64,
    /// Per-row multiplier: leaves higher up (smaller row) are heavier.
    pub leaf_row_falloff: f64,
    /// Columns over which the off-center penalty doubles the weight.
    pub leaf_column_spread: f64,
    /// Lower bound of the `3 - 1/l` lightness term.
    pub leaf_lightness_floor: f64,
    /// Column the off-center penalty is measured from; half the width when unset.
    pub leaf_center_column: Option<f64>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            hat_row_cutoff: 30,
            hat_hue: 45.0,
            hat_hue_tolerance: 5.0,
            eye_colors: vec![
                Rgba8::opaque(0xff, 0xff, 0xff),
                Rgba8::opaque(0x0d, 0x1a, 0x02),
                Rgba8::opaque(0x13, 0x23, 0x05),
                Rgba8::opaque(0x28, 0x3f, 0x14),
            ],
            cheek_hue: 313.0,
            mouth_hue: 91.0,
            leaf_hue: 92.0,
            leaf_hue_tolerance: 5.0,
            weights: CategoryWeights::default(),
            leaf_base_weight: 25.0,
            leaf_row_falloff: 0.95,
            leaf_column_spread: 16.0,
            leaf_lightness_floor: 0.25,
            leaf_center_column: None,
        }
    }
}

// Hues are whole degrees, so half a degree separates neighbours.
fn same_hue(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.5
}

impl ClassifierRules {
    /// First matching rule wins.
    pub fn classify_pixel(&self, color: Rgba8, row: usize) -> PixelCategory {
        if color.a == 0 {
            return PixelCategory::Empty;
        }
        let hsl = color.to_hsla();
        if row <= self.hat_row_cutoff && (hsl.h - self.hat_hue).abs() < self.hat_hue_tolerance {
            return PixelCategory::Hat;
        }
        if color.is_opaque() && self.eye_colors.iter().any(|&eye| eye.same_rgb(color)) {
            return PixelCategory::Eyes;
        }
        if same_hue(hsl.h, self.cheek_hue) {
            return PixelCategory::Cheek;
        }
        if same_hue(hsl.h, self.mouth_hue) {
            return PixelCategory::Mouth;
        }
        if (hsl.h - self.leaf_hue).abs() < self.leaf_hue_tolerance {
            return PixelCategory::Leaf;
        }
        PixelCategory::Trunk
    }

    /// Weight of a pixel already classified as `category`. Empty pixels are
    /// infinitely heavy.
    pub fn pixel_weight(
        &self,
        category: PixelCategory,
        color: Rgba8,
        col: usize,
        row: usize,
        center: f64,
    ) -> f64 {
        match category {
            PixelCategory::Empty => f64::INFINITY,
            PixelCategory::Trunk => self.weights.trunk,
            PixelCategory::Hat => self.weights.hat,
            PixelCategory::Eyes => self.weights.eyes,
            PixelCategory::Cheek => self.weights.cheek,
            PixelCategory::Mouth => self.weights.mouth,
            PixelCategory::Leaf => {
                let l = color.to_hsla().l;
                let lightness = (3.0 - 1.0 / l).max(self.leaf_lightness_floor);
                let off_center = (col as f64 - center).abs() / self.leaf_column_spread;
                self.leaf_base_weight
                    * self.leaf_row_falloff.powi(row as i32)
                    * 2.0
                    * lightness.powf(2.4)
                    * (1.0 + off_center)
            }
        }
    }
}

/// Category and weight grids for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    categories: Grid<PixelCategory>,
    weights: Grid<f64>,
}

impl Classification {
    pub fn compute(pixels: &PixelBuffer, rules: &ClassifierRules) -> Self {
        let width = pixels.width();
        let center = rules.leaf_center_column.unwrap_or(width as f64 / 2.0);
        let categories = pixels.map(|_, y, &c| rules.classify_pixel(c, y));
        let weights = pixels.map(|x, y, &c| {
            let category = categories.data()[y * width + x];
            rules.pixel_weight(category, c, x, y, center)
        });
        Self {
            categories,
            weights,
        }
    }

    pub fn categories(&self) -> &Grid<PixelCategory> {
        &self.categories
    }

    pub fn weights(&self) -> &Grid<f64> {
        &self.weights
    }

    /// Number of pixels per category. Categories with no pixels are omitted.
    pub fn counts(&self) -> BTreeMap<PixelCategory, usize> {
        let mut counts = BTreeMap::new();
        for &category in self.categories.data() {
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
    }

    /// Smallest and largest finite weight, or `None` for a fully empty image.
    pub fn weight_range(&self) -> Option<(f64, f64)> {
        self.weights
            .data()
            .iter()
            .copied()
            .filter(|w| w.is_finite())
            .fold(None, |acc, w| match acc {
                None => Some((w, w)),
                Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
            })
    }
}

/// Memoizing wrapper around [`Classification::compute`].
#[derive(Debug, Clone, Default)]
pub struct PixelClassifier {
    rules: ClassifierRules,
    cached: Option<Classification>,
}

impl PixelClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self {
            rules,
            cached: None,
        }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Replaces the rules and drops the cached result.
    pub fn set_rules(&mut self, rules: ClassifierRules) {
        self.rules = rules;
        self.invalidate();
    }

    /// Returns the cached classification, computing it first if needed.
    pub fn classify(&mut self, pixels: &PixelBuffer) -> &Classification {
        let rules = &self.rules;
        self.cached.get_or_insert_with(|| {
            let classification = Classification::compute(pixels, rules);
            debug!(
                width = pixels.width(),
                height = pixels.height(),
                counts = ?classification.counts(),
                "classified image"
            );
            classification
        })
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn cached(&self) -> Option<&Classification> {
        self.cached.as_ref()
    }
}
