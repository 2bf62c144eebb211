#![deny(unsafe_code)]
//! Core types and traits for the windsway sprite animation system.
//!
//! Provides the `Stage` trait, the generic row-major `Grid`, the
//! `SimulationState` that owns every per-pixel grid, the pixel classifier
//! (category + weight), RGBA/HSL color types, the `Xorshift64` PRNG, and
//! JSON parameter helpers.

pub mod classify;
pub mod color;
pub mod error;
pub mod grid;
pub mod params;
pub mod pixels;
pub mod prng;
pub mod stage;
pub mod state;
pub mod vector;

pub use classify::{Classification, ClassifierRules, PixelCategory, PixelClassifier};
pub use color::{Hsla, Rgba8};
pub use error::SwayError;
pub use grid::{Grid, VectorGrid};
pub use pixels::PixelBuffer;
pub use prng::Xorshift64;
pub use stage::Stage;
pub use state::SimulationState;
pub use vector::{Vector2, VectorExt};
