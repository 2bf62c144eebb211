#![deny(unsafe_code)]
//! Scene layer: everything between the physics stages and a screen.
//!
//! [`Simulation`] owns the shared state and the wind, spring and particle
//! stages, drains pointer impulses, and runs the frame loop. [`Projector`]
//! maps grid cells to canvas pixels, [`render::Rasterizer`] draws a frame on
//! the CPU, and the `png` feature adds PNG load/save. Both the CLI and the
//! WASM host depend on this crate.

pub mod config;
pub mod ground;
pub mod pointer;
pub mod projector;
pub mod render;
pub mod simulation;

#[cfg(feature = "png")]
pub mod snapshot;

pub use config::{FrameParams, GroundAnchor, GroundParams, PointerParams, RenderParams, SceneConfig};
pub use ground::{generate_ground, GroundTile};
pub use pointer::{Impulse, PointerId, PointerTracker};
pub use projector::Projector;
pub use render::{Frame, Rasterizer};
pub use simulation::Simulation;
