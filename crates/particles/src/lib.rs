#![deny(unsafe_code)]
//! Particle stage: detached leaves and wind wisps.
//!
//! Each tick, every grid cell runs two Bernoulli trials driven by its local
//! wind power: leaf cells may shed a leaf, and any windy cell may emit a
//! short white wisp. Particles carry their own position and velocity, sample
//! the wind field by truncating to the enclosing cell, and never write back
//! into it. Color and size are pure functions of age.

use glam::DVec2;
use serde_json::{json, Value};
use tracing::trace;
use windsway_core::params::{param_f64, param_usize};
use windsway_core::{
    Grid, Hsla, PixelBuffer, PixelCategory, SimulationState, Stage, SwayError, VectorExt,
    VectorGrid, Xorshift64,
};

const DEFAULT_LEAF_LIFETIME: f64 = 5.0;
const DEFAULT_LEAF_FADE: f64 = 2.0;
const DEFAULT_WISP_LIFETIME: f64 = 0.5;
const DEFAULT_SPAWN_THRESHOLD: f64 = 0.2;
const DEFAULT_MAX_PARTICLES: usize = 4096;

/// Per-unit-power survival base of the leaf trial at the top row.
const LEAF_SURVIVAL_BASE: f64 = 0.9;
/// Per-unit-power survival base of the wisp trial.
const WISP_SURVIVAL_BASE: f64 = 0.1;
const LEAF_DAMPING_BASE: f64 = 0.8;
const LEAF_DAMPING_RATE: f64 = 20.0;
const LEAF_PUSH: f64 = 160.0;
const LEAF_DRIFT: f64 = 0.1;
const WISP_FOLLOW_RATE: f64 = 100.0;
const WISP_SPEED: f64 = 30.0;
const WISP_MIN_SPEED: f64 = 0.1;
const WISP_ALPHA: f64 = 0.1;
/// Wisps shrink as `1 / (1 + r·t)` and fade as `1 − r·t`.
const WISP_DECAY_RATE: f64 = 2.0;

/// Tunable constants of the particle stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleParams {
    pub leaf_lifetime: f64,
    /// Leaves fade out linearly over the last `leaf_fade` seconds.
    pub leaf_fade: f64,
    pub wisp_lifetime: f64,
    /// Wind power needed before a cell can spawn anything.
    pub spawn_threshold: f64,
    /// Spawning pauses while this many particles are alive.
    pub max_particles: usize,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            leaf_lifetime: DEFAULT_LEAF_LIFETIME,
            leaf_fade: DEFAULT_LEAF_FADE,
            wisp_lifetime: DEFAULT_WISP_LIFETIME,
            spawn_threshold: DEFAULT_SPAWN_THRESHOLD,
            max_particles: DEFAULT_MAX_PARTICLES,
        }
    }
}

impl ParticleParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        Self {
            leaf_lifetime: param_f64(params, "leaf_lifetime", DEFAULT_LEAF_LIFETIME),
            leaf_fade: param_f64(params, "leaf_fade", DEFAULT_LEAF_FADE),
            wisp_lifetime: param_f64(params, "wisp_lifetime", DEFAULT_WISP_LIFETIME),
            spawn_threshold: param_f64(params, "spawn_threshold", DEFAULT_SPAWN_THRESHOLD),
            max_particles: param_usize(params, "max_particles", DEFAULT_MAX_PARTICLES),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Leaf,
    WindWisp,
}

/// A live particle. Positions are in grid units.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub age: f64,
    pub lifetime: f64,
    pub position: DVec2,
    pub velocity: DVec2,
    color: Hsla,
    base_size: f64,
    fade: f64,
}

impl Particle {
    /// A leaf shed from the pixel at `(col, row)` with source color `hsl`.
    pub fn leaf(
        hsl: Hsla,
        col: usize,
        row: usize,
        params: &ParticleParams,
        rng: &mut Xorshift64,
    ) -> Self {
        let darken = 0.9 - 0.1 * rng.next_f64();
        let lightness = (hsl.l * darken + 0.2 - row as f64 / 150.0).min(1.0);
        let shimmer = rng.next_f64() / 20.0 + 0.2;
        let position = DVec2::new(col as f64 + rng.next_f64(), row as f64 + rng.next_f64());
        let base_size = rng.next_range(0.4, 0.9);
        Self {
            kind: ParticleKind::Leaf,
            age: 0.0,
            lifetime: params.leaf_lifetime,
            position,
            velocity: DVec2::ZERO,
            color: Hsla::new(
                hsl.h,
                hsl.s * 0.95,
                (lightness + shimmer).min(1.0),
                hsl.a * 0.7,
            ),
            base_size,
            fade: params.leaf_fade,
        }
    }

    /// A wisp leaving cell `(col, row)` with the local wind as its velocity.
    pub fn wisp(
        wind: DVec2,
        col: usize,
        row: usize,
        params: &ParticleParams,
        rng: &mut Xorshift64,
    ) -> Self {
        let position = DVec2::new(col as f64 + rng.next_f64(), row as f64 + rng.next_f64());
        Self {
            kind: ParticleKind::WindWisp,
            age: 0.0,
            lifetime: params.wisp_lifetime,
            position,
            velocity: wind,
            color: Hsla::new(0.0, 0.0, 1.0, WISP_ALPHA),
            base_size: 0.0,
            fade: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.age <= self.lifetime
    }

    /// Color at the current age.
    pub fn color(&self) -> Hsla {
        let alpha = match self.kind {
            ParticleKind::Leaf => {
                let fade_start = self.lifetime - self.fade;
                if self.age > fade_start && self.fade > 0.0 {
                    (1.0 - (self.age - fade_start) / self.fade).max(0.0)
                } else {
                    1.0
                }
            }
            ParticleKind::WindWisp => (1.0 - WISP_DECAY_RATE * self.age).max(0.0),
        };
        Hsla {
            a: self.color.a * alpha,
            ..self.color
        }
    }

    /// Side length of the drawn square, in grid units.
    pub fn size(&self) -> f64 {
        match self.kind {
            ParticleKind::Leaf => self.base_size * 0.8_f64.powf(1.0 + self.age),
            ParticleKind::WindWisp => {
                (self.velocity.length().sqrt() / 1.5 + 0.1) / (1.0 + WISP_DECAY_RATE * self.age)
            }
        }
    }

    /// Ages the particle by `dt` and integrates its motion.
    pub fn advance(&mut self, wind: &VectorGrid, dt: f64) {
        self.age += dt;
        let t = self.age;
        let local = wind.sample(self.position).copied();
        match self.kind {
            ParticleKind::Leaf => {
                let drift =
                    DVec2::new((2.0 * t).cos(), (2.0 * t).sin().abs()) * LEAF_DRIFT * (1.0 + t / 3.0);
                let damping = LEAF_DAMPING_BASE.powf(LEAF_DAMPING_RATE * dt);
                self.velocity = self.velocity * damping
                    + (local.unwrap_or(DVec2::ZERO) + drift) * (dt * LEAF_PUSH);
                self.position += self.velocity * dt;
            }
            ParticleKind::WindWisp => {
                if let Some(w) = local {
                    let keep = 0.5_f64.powf(WISP_FOLLOW_RATE * dt);
                    self.velocity = w * (1.0 - keep) + self.velocity * keep;
                }
                self.position += self.velocity.with_min_length(WISP_MIN_SPEED) * (dt * WISP_SPEED);
            }
        }
    }
}

/// Particle stage: owns the live particle set and its PRNG.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    params: ParticleParams,
    rng: Xorshift64,
    particles: Vec<Particle>,
}

impl ParticleSystem {
    pub fn new(params: ParticleParams, seed: u64) -> Self {
        Self {
            params,
            rng: Xorshift64::new(seed),
            particles: Vec::new(),
        }
    }

    pub fn from_json(params: &Value, seed: u64) -> Self {
        Self::new(ParticleParams::from_json(params), seed)
    }

    pub fn particle_params(&self) -> &ParticleParams {
        &self.params
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn spawn(
        &mut self,
        pixels: &PixelBuffer,
        categories: &Grid<PixelCategory>,
        wind: &VectorGrid,
        dt: f64,
    ) {
        let height = wind.height() as f64;
        let threshold = self.params.spawn_threshold;
        for (x, y, &dir) in wind.iter() {
            let power = dir.length();
            if power < threshold {
                continue;
            }
            let i = y * wind.width() + x;
            if categories.data()[i] == PixelCategory::Leaf {
                let survival = LEAF_SURVIVAL_BASE - y as f64 / height / 3.0;
                if self.rng.chance(1.0 - survival.powf(power * dt / 2.0)) {
                    let hsl = pixels.data()[i].to_hsla();
                    let leaf = Particle::leaf(hsl, x, y, &self.params, &mut self.rng);
                    if !self.push(leaf) {
                        return;
                    }
                }
            }
            if power > threshold
                && self.rng.chance(1.0 - WISP_SURVIVAL_BASE.powf(power * dt / 2.0))
            {
                let wisp = Particle::wisp(dir, x, y, &self.params, &mut self.rng);
                if !self.push(wisp) {
                    return;
                }
            }
        }
    }

    /// Adds a particle unless the cap is reached.
    fn push(&mut self, particle: Particle) -> bool {
        if self.particles.len() >= self.params.max_particles {
            trace!(live = self.particles.len(), "particle cap reached");
            return false;
        }
        self.particles.push(particle);
        true
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(ParticleParams::default(), 1)
    }
}

impl Stage for ParticleSystem {
    fn name(&self) -> &'static str {
        "particles"
    }

    /// Spawns, then ages every particle (new ones included) by `dt` and
    /// drops those past their lifetime.
    fn step(&mut self, state: &mut SimulationState, dt: f64) -> Result<(), SwayError> {
        let dt = dt.max(0.0);
        let classification = state.classification()?;
        state.wind.ensure_same_shape(classification.categories())?;
        self.spawn(&state.pixels, classification.categories(), &state.wind, dt);
        for particle in &mut self.particles {
            particle.advance(&state.wind, dt);
        }
        self.particles.retain(Particle::is_alive);
        Ok(())
    }

    fn params(&self) -> Value {
        json!({
            "leaf_lifetime": self.params.leaf_lifetime,
            "leaf_fade": self.params.leaf_fade,
            "wisp_lifetime": self.params.wisp_lifetime,
            "spawn_threshold": self.params.spawn_threshold,
            "max_particles": self.params.max_particles,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "leaf_lifetime": {
                "type": "number",
                "default": DEFAULT_LEAF_LIFETIME,
                "min": 0.1,
                "max": 30.0,
                "description": "Seconds a detached leaf stays alive"
            },
            "leaf_fade": {
                "type": "number",
                "default": DEFAULT_LEAF_FADE,
                "min": 0.0,
                "max": 30.0,
                "description": "Seconds over which a leaf fades out before dying"
            },
            "wisp_lifetime": {
                "type": "number",
                "default": DEFAULT_WISP_LIFETIME,
                "min": 0.05,
                "max": 5.0,
                "description": "Seconds a wind wisp stays alive"
            },
            "spawn_threshold": {
                "type": "number",
                "default": DEFAULT_SPAWN_THRESHOLD,
                "min": 0.0,
                "max": 5.0,
                "description": "Wind power a cell needs before it can spawn particles"
            },
            "max_particles": {
                "type": "integer",
                "default": DEFAULT_MAX_PARTICLES,
                "min": 0,
                "max": 65536,
                "description": "Spawning pauses while this many particles are alive"
            }
        })
    }

    fn reset(&mut self) {
        self.particles.clear();
    }
}
