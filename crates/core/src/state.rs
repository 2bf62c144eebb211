//! Shared per-image simulation state.

use tracing::debug;

use crate::classify::{Classification, ClassifierRules, PixelClassifier};
use crate::error::SwayError;
use crate::grid::VectorGrid;
use crate::pixels::PixelBuffer;

/// Every grid aligned to the loaded image, plus its classification.
///
/// Fields are public so that a stage can borrow, say, `wind` immutably and
/// `displacement` mutably at the same time.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub pixels: PixelBuffer,
    pub classifier: PixelClassifier,
    pub wind: VectorGrid,
    pub displacement: VectorGrid,
    pub force: VectorGrid,
}

impl SimulationState {
    /// Builds zeroed grids shaped like `pixels` and classifies the image.
    pub fn new(pixels: PixelBuffer, rules: ClassifierRules) -> Result<Self, SwayError> {
        let (w, h) = (pixels.width(), pixels.height());
        let mut state = Self {
            wind: VectorGrid::new(w, h)?,
            displacement: VectorGrid::new(w, h)?,
            force: VectorGrid::new(w, h)?,
            classifier: PixelClassifier::new(rules),
            pixels,
        };
        state.refresh();
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Swaps in a new image: every grid is rebuilt at the new shape and the
    /// classification is recomputed.
    pub fn replace_image(&mut self, pixels: PixelBuffer) -> Result<(), SwayError> {
        let (w, h) = (pixels.width(), pixels.height());
        self.wind = VectorGrid::new(w, h)?;
        self.displacement = VectorGrid::new(w, h)?;
        self.force = VectorGrid::new(w, h)?;
        self.pixels = pixels;
        self.classifier.invalidate();
        debug!(width = w, height = h, "image replaced");
        self.refresh();
        Ok(())
    }

    /// Recomputes the classification if it was invalidated.
    pub fn refresh(&mut self) -> &Classification {
        self.classifier.classify(&self.pixels)
    }

    /// The current classification, or `SwayError::NotClassified` after an
    /// `invalidate()` that has not been followed by `refresh()`.
    pub fn classification(&self) -> Result<&Classification, SwayError> {
        self.classifier.cached().ok_or(SwayError::NotClassified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PixelCategory;
    use crate::color::Rgba8;
    use crate::grid::Grid;
    use glam::DVec2;

    fn bark(w: usize, h: usize) -> PixelBuffer {
        Grid::filled(w, h, Rgba8::opaque(120, 80, 40)).unwrap()
    }

    #[test]
    fn new_state_is_classified_with_zero_fields() {
        let state = SimulationState::new(bark(3, 2), ClassifierRules::default()).unwrap();
        assert_eq!((state.width(), state.height()), (3, 2));
        assert!(state.wind.same_shape(&state.pixels));
        assert_eq!(state.wind.total_power(), 0.0);
        let c = state.classification().unwrap();
        assert_eq!(c.categories().data()[0], PixelCategory::Trunk);
    }

    #[test]
    fn replace_image_resizes_and_reclassifies() {
        let mut state = SimulationState::new(bark(3, 2), ClassifierRules::default()).unwrap();
        *state.wind.get_mut(0, 0).unwrap() = DVec2::new(1.0, 0.0);
        state
            .replace_image(Grid::filled(5, 4, Rgba8::TRANSPARENT).unwrap())
            .unwrap();
        assert_eq!((state.wind.width(), state.wind.height()), (5, 4));
        assert_eq!(state.wind.total_power(), 0.0);
        let c = state.classification().unwrap();
        assert!(c.categories().same_shape(&state.pixels));
        assert_eq!(c.categories().data()[0], PixelCategory::Empty);
    }

    #[test]
    fn classification_errors_until_refreshed() {
        let mut state = SimulationState::new(bark(2, 2), ClassifierRules::default()).unwrap();
        state.classifier.invalidate();
        assert!(matches!(state.classification(), Err(SwayError::NotClassified)));
        state.refresh();
        assert!(state.classification().is_ok());
    }
}
