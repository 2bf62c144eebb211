//! The `Stage` trait implemented by each per-frame simulation pass.
//!
//! A frame is a fixed pipeline of stages (wind, spring, particles). Every
//! stage reads and writes the shared [`SimulationState`] and owns only its
//! own parameters and scratch buffers. The trait is object-safe so a
//! pipeline can be held as `Vec<Box<dyn Stage>>`.

use crate::error::SwayError;
use crate::state::SimulationState;
use serde_json::Value;

/// One pass of the per-frame simulation pipeline.
pub trait Stage {
    /// Short stable identifier, used in logs and parameter listings.
    fn name(&self) -> &'static str;

    /// Advance this stage by `dt` seconds against the shared state.
    ///
    /// Returns an error if the state is not ready for this stage (for
    /// instance the classification cache was invalidated and not refreshed).
    fn step(&mut self, state: &mut SimulationState, dt: f64) -> Result<(), SwayError>;

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Schema describing all available parameters, their types, ranges, and defaults.
    fn param_schema(&self) -> Value;

    /// Drops any state carried between frames. Called when a new image loads.
    fn reset(&mut self) {}
}
