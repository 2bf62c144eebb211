#![deny(unsafe_code)]
//! Displacement stage: one damped spring per pixel.
//!
//! Wind pushes each pixel away from its rest position with a force scaled by
//! `1 / weight`; a restoring term pulls it back. The per-pixel force acts as
//! a velocity accumulator and decays exponentially each tick.

use serde_json::{json, Value};
use windsway_core::params::param_f64;
use windsway_core::{SimulationState, Stage, SwayError};

const DEFAULT_DAMPING_BASE: f64 = 0.8;
const DEFAULT_DAMPING_RATE: f64 = 20.0;
const DEFAULT_WIND_GAIN: f64 = 50.0;
const DEFAULT_STIFFNESS: f64 = 40.0;
const DEFAULT_GAIN: f64 = 5.0;

/// Tunable constants of the spring stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    /// Force decays by `damping_base^(damping_rate * dt)` per tick.
    pub damping_base: f64,
    pub damping_rate: f64,
    /// Multiplier on the local wind vector.
    pub wind_gain: f64,
    /// Multiplier on the restoring pull towards rest.
    pub stiffness: f64,
    /// Displacement integration gain.
    pub gain: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            damping_base: DEFAULT_DAMPING_BASE,
            damping_rate: DEFAULT_DAMPING_RATE,
            wind_gain: DEFAULT_WIND_GAIN,
            stiffness: DEFAULT_STIFFNESS,
            gain: DEFAULT_GAIN,
        }
    }
}

impl SpringParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        Self {
            damping_base: param_f64(params, "damping_base", DEFAULT_DAMPING_BASE),
            damping_rate: param_f64(params, "damping_rate", DEFAULT_DAMPING_RATE),
            wind_gain: param_f64(params, "wind_gain", DEFAULT_WIND_GAIN),
            stiffness: param_f64(params, "stiffness", DEFAULT_STIFFNESS),
            gain: param_f64(params, "gain", DEFAULT_GAIN),
        }
    }
}

/// Spring stage: integrates force and displacement for every weighted pixel.
#[derive(Debug, Clone, Default)]
pub struct SpringSimulator {
    params: SpringParams,
}

impl SpringSimulator {
    pub fn new(params: SpringParams) -> Self {
        Self { params }
    }

    pub fn from_json(params: &Value) -> Self {
        Self::new(SpringParams::from_json(params))
    }

    pub fn spring_params(&self) -> &SpringParams {
        &self.params
    }
}

impl Stage for SpringSimulator {
    fn name(&self) -> &'static str {
        "spring"
    }

    /// Pixels with infinite weight (empty) are skipped and never move.
    fn step(&mut self, state: &mut SimulationState, dt: f64) -> Result<(), SwayError> {
        let dt = dt.max(0.0);
        let SimulationState {
            classifier,
            wind,
            displacement,
            force,
            ..
        } = state;
        let weights = classifier.cached().ok_or(SwayError::NotClassified)?.weights();
        wind.ensure_same_shape(weights)?;

        let p = &self.params;
        let damping = p.damping_base.powf(p.damping_rate * dt);
        let cells = weights
            .data()
            .iter()
            .zip(wind.data())
            .zip(force.data_mut().iter_mut().zip(displacement.data_mut()));
        for ((&weight, &w), (f, d)) in cells {
            if !weight.is_finite() {
                continue;
            }
            *f = *f * damping + (w * p.wind_gain - *d * p.stiffness) * (dt / weight);
            *d += *f * (p.gain * dt);
        }
        Ok(())
    }

    fn params(&self) -> Value {
        json!({
            "damping_base": self.params.damping_base,
            "damping_rate": self.params.damping_rate,
            "wind_gain": self.params.wind_gain,
            "stiffness": self.params.stiffness,
            "gain": self.params.gain,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "damping_base": {
                "type": "number",
                "default": DEFAULT_DAMPING_BASE,
                "min": 0.0,
                "max": 1.0,
                "description": "Base of the per-tick force damping"
            },
            "damping_rate": {
                "type": "number",
                "default": DEFAULT_DAMPING_RATE,
                "min": 0.0,
                "max": 120.0,
                "description": "Damping exponent per second"
            },
            "wind_gain": {
                "type": "number",
                "default": DEFAULT_WIND_GAIN,
                "min": 0.0,
                "max": 200.0,
                "description": "How strongly wind pushes a pixel"
            },
            "stiffness": {
                "type": "number",
                "default": DEFAULT_STIFFNESS,
                "min": 0.0,
                "max": 200.0,
                "description": "How strongly a pixel is pulled back to rest"
            },
            "gain": {
                "type": "number",
                "default": DEFAULT_GAIN,
                "min": 5.0,
                "max": 10.0,
                "description": "Displacement integration gain"
            }
        })
    }
}
