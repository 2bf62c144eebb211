//! Scene-wide configuration: one JSON object with a section per stage.
//!
//! ```json
//! {
//!   "seed": 7,
//!   "wind": {"impulse_radius": 6},
//!   "spring": {"gain": 8},
//!   "particles": {"max_particles": 1024},
//!   "classifier": {"eye_colors": ["#ffffff"]},
//!   "frame": {"speed": 0.5},
//!   "pointer": {"forget_after_frames": 10},
//!   "ground": {"min_height": 2},
//!   "render": {"background": "#cfe8ff", "wind_arrows": true}
//! }
//! ```
//!
//! Stage sections go through each stage's lenient `from_json` (values of the
//! wrong type fall back to defaults), then every number is checked against
//! its schema range. The classifier and render sections are strictly
//! deserialized, so a malformed color is reported instead of ignored.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use windsway_core::params::{param_bool, param_f64, param_u64, param_usize};
use windsway_core::{ClassifierRules, Rgba8, Stage, SwayError};
use windsway_particles::{ParticleParams, ParticleSystem};
use windsway_spring::{SpringParams, SpringSimulator};
use windsway_wind::{WindParams, WindSimulator};

const DEFAULT_SEED: u64 = 1;
const DEFAULT_MAX_DT: f64 = 0.1;
const DEFAULT_SPEED: f64 = 1.0;
const DEFAULT_FORGET_AFTER_FRAMES: u64 = 30;
const DEFAULT_GROUND_WIDTH_FACTOR: usize = 4;
const DEFAULT_GROUND_MIN_HEIGHT: usize = 3;
const DEFAULT_GROUND_MAX_HEIGHT: usize = 5;

/// Frame timing: wall-clock deltas are clamped then scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub max_dt: f64,
    pub speed: f64,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            max_dt: DEFAULT_MAX_DT,
            speed: DEFAULT_SPEED,
        }
    }
}

impl FrameParams {
    pub fn from_json(params: &Value) -> Self {
        Self {
            max_dt: param_f64(params, "max_dt", DEFAULT_MAX_DT),
            speed: param_f64(params, "speed", DEFAULT_SPEED),
        }
    }

    /// Simulation time step for `elapsed` wall-clock seconds. Never negative.
    pub fn frame_dt(&self, elapsed: f64) -> f64 {
        (elapsed.min(self.max_dt) * self.speed).max(0.0)
    }

    pub fn to_json(&self) -> Value {
        json!({"max_dt": self.max_dt, "speed": self.speed})
    }

    pub fn schema() -> Value {
        json!({
            "max_dt": {
                "type": "number",
                "default": DEFAULT_MAX_DT,
                "min": 0.0,
                "max": 1.0,
                "description": "Longest wall-clock delta a single frame may simulate"
            },
            "speed": {
                "type": "number",
                "default": DEFAULT_SPEED,
                "min": 0.0,
                "max": 10.0,
                "description": "Simulation speed multiplier"
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerParams {
    /// Pointers not seen for this many frames are forgotten.
    pub forget_after_frames: u64,
}

impl Default for PointerParams {
    fn default() -> Self {
        Self {
            forget_after_frames: DEFAULT_FORGET_AFTER_FRAMES,
        }
    }
}

impl PointerParams {
    pub fn from_json(params: &Value) -> Self {
        Self {
            forget_after_frames: param_u64(
                params,
                "forget_after_frames",
                DEFAULT_FORGET_AFTER_FRAMES,
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({"forget_after_frames": self.forget_after_frames})
    }

    pub fn schema() -> Value {
        json!({
            "forget_after_frames": {
                "type": "integer",
                "default": DEFAULT_FORGET_AFTER_FRAMES,
                "min": 0,
                "max": 3600,
                "description": "Frames without a sample before a pointer is dropped"
            }
        })
    }
}

/// Horizontal placement of the ground strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundAnchor {
    /// Strip centered under the sprite.
    #[default]
    Centered,
    /// Strip middle at the sprite's left edge.
    LeftEdge,
}

impl GroundAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            GroundAnchor::Centered => "centered",
            GroundAnchor::LeftEdge => "left_edge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "centered" => Some(GroundAnchor::Centered),
            "left_edge" => Some(GroundAnchor::LeftEdge),
            _ => None,
        }
    }
}

/// Decorative ground strip generated on every image load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundParams {
    pub enabled: bool,
    pub anchor: GroundAnchor,
    /// Strip width as a multiple of the sprite width.
    pub width_factor: usize,
    pub min_height: usize,
    pub max_height: usize,
}

impl Default for GroundParams {
    fn default() -> Self {
        Self {
            enabled: true,
            anchor: GroundAnchor::default(),
            width_factor: DEFAULT_GROUND_WIDTH_FACTOR,
            min_height: DEFAULT_GROUND_MIN_HEIGHT,
            max_height: DEFAULT_GROUND_MAX_HEIGHT,
        }
    }
}

impl GroundParams {
    pub fn from_json(params: &Value) -> Self {
        Self {
            enabled: param_bool(params, "enabled", true),
            anchor: params
                .get("anchor")
                .and_then(Value::as_str)
                .and_then(GroundAnchor::from_name)
                .unwrap_or_default(),
            width_factor: param_usize(params, "width_factor", DEFAULT_GROUND_WIDTH_FACTOR),
            min_height: param_usize(params, "min_height", DEFAULT_GROUND_MIN_HEIGHT),
            max_height: param_usize(params, "max_height", DEFAULT_GROUND_MAX_HEIGHT),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "enabled": self.enabled,
            "width_factor": self.width_factor,
            "min_height": self.min_height,
            "max_height": self.max_height,
            "anchor": self.anchor.as_str(),
        })
    }

    pub fn schema() -> Value {
        json!({
            "width_factor": {
                "type": "integer",
                "default": DEFAULT_GROUND_WIDTH_FACTOR,
                "min": 1,
                "max": 16,
                "description": "Strip width as a multiple of the sprite width"
            },
            "min_height": {
                "type": "integer",
                "default": DEFAULT_GROUND_MIN_HEIGHT,
                "min": 1,
                "max": 32,
                "description": "Lowest terrain column, in tiles"
            },
            "max_height": {
                "type": "integer",
                "default": DEFAULT_GROUND_MAX_HEIGHT,
                "min": 1,
                "max": 32,
                "description": "Highest terrain column, in tiles"
            }
        })
    }
}

/// Rasterizer options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub background: Rgba8,
    /// Draw a debug arrow over every cell with noticeable wind.
    pub wind_arrows: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            background: Rgba8::TRANSPARENT,
            wind_arrows: false,
        }
    }
}

/// Every tunable of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub seed: u64,
    pub wind: WindParams,
    pub spring: SpringParams,
    pub particles: ParticleParams,
    pub classifier: ClassifierRules,
    pub frame: FrameParams,
    pub pointer: PointerParams,
    pub ground: GroundParams,
    pub render: RenderParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            wind: WindParams::default(),
            spring: SpringParams::default(),
            particles: ParticleParams::default(),
            classifier: ClassifierRules::default(),
            frame: FrameParams::default(),
            pointer: PointerParams::default(),
            ground: GroundParams::default(),
            render: RenderParams::default(),
        }
    }
}

fn strict<T: serde::de::DeserializeOwned + Default>(
    value: &Value,
    key: &str,
) -> Result<T, SwayError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(section) => serde_json::from_value(section.clone())
            .map_err(|e| SwayError::InvalidConfig(format!("{key}: {e}"))),
    }
}

impl SceneConfig {
    /// Reads a config object. Missing sections keep their defaults; `null`
    /// is accepted as an empty config.
    pub fn from_json(value: &Value) -> Result<Self, SwayError> {
        if !(value.is_object() || value.is_null()) {
            return Err(SwayError::InvalidConfig(
                "scene config must be a JSON object".into(),
            ));
        }
        let section = |key: &str| value.get(key).cloned().unwrap_or(Value::Null);
        let config = Self {
            seed: param_u64(value, "seed", DEFAULT_SEED),
            wind: WindParams::from_json(&section("wind")),
            spring: SpringParams::from_json(&section("spring")),
            particles: ParticleParams::from_json(&section("particles")),
            classifier: strict(value, "classifier")?,
            frame: FrameParams::from_json(&section("frame")),
            pointer: PointerParams::from_json(&section("pointer")),
            ground: GroundParams::from_json(&section("ground")),
            render: strict(value, "render")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, SwayError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SwayError::InvalidConfig(format!("malformed JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Current values of every section, in the shape `from_json` reads.
    pub fn params(&self) -> Value {
        let mut out = self.stage_sections(|stage| stage.params());
        out.insert("seed".into(), json!(self.seed));
        out.insert(
            "classifier".into(),
            serde_json::to_value(&self.classifier).unwrap_or_default(),
        );
        out.insert("frame".into(), self.frame.to_json());
        out.insert("pointer".into(), self.pointer.to_json());
        out.insert("ground".into(), self.ground.to_json());
        out.insert(
            "render".into(),
            serde_json::to_value(self.render).unwrap_or_default(),
        );
        Value::Object(out)
    }

    /// Schema of every numeric section, keyed like [`SceneConfig::params`].
    pub fn param_schema(&self) -> Value {
        let mut out = self.stage_sections(|stage| stage.param_schema());
        out.insert("frame".into(), FrameParams::schema());
        out.insert("pointer".into(), PointerParams::schema());
        out.insert("ground".into(), GroundParams::schema());
        Value::Object(out)
    }

    /// Checks every numeric value against the `min`/`max` of its schema entry.
    pub fn validate(&self) -> Result<(), SwayError> {
        let params = self.params();
        for (section, fields) in self.param_schema().as_object().into_iter().flatten() {
            for (key, spec) in fields.as_object().into_iter().flatten() {
                let Some(value) = params[section.as_str()][key.as_str()].as_f64() else {
                    continue;
                };
                let min = spec["min"].as_f64().unwrap_or(f64::NEG_INFINITY);
                let max = spec["max"].as_f64().unwrap_or(f64::INFINITY);
                if !(min..=max).contains(&value) {
                    return Err(SwayError::InvalidConfig(format!(
                        "{section}.{key} = {value} is outside {min}..={max}"
                    )));
                }
            }
        }
        if self.ground.min_height > self.ground.max_height {
            return Err(SwayError::InvalidConfig(format!(
                "ground.min_height {} exceeds ground.max_height {}",
                self.ground.min_height, self.ground.max_height
            )));
        }
        Ok(())
    }

    fn stage_sections(&self, f: impl Fn(&dyn Stage) -> Value) -> serde_json::Map<String, Value> {
        let wind = WindSimulator::new(self.wind);
        let spring = SpringSimulator::new(self.spring);
        let particles = ParticleSystem::new(self.particles, self.seed);
        let stages: [&dyn Stage; 3] = [&wind, &spring, &particles];
        stages
            .into_iter()
            .map(|stage| (stage.name().to_string(), f(stage)))
            .collect()
    }
}
