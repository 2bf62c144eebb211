#![deny(unsafe_code)]
//! Wind field stage.
//!
//! The wind field is a grid of 2D vectors aligned to the sprite. Pointer
//! gestures inject impulses into a square neighborhood; each tick every
//! non-zero vector hands part of itself to two neighbors, the cardinal and
//! the diagonal cell bounding its 45° sector, with exponential decay. There
//! is no pressure solve: wind simply flows along its own direction and
//! fades out.

use std::f64::consts::PI;

use glam::DVec2;
use serde_json::{json, Value};
use tracing::trace;
use windsway_core::params::{param_f64, param_usize};
use windsway_core::{SimulationState, Stage, SwayError, VectorExt, VectorGrid};

/// Base of the per-tick decay `decay_base^(decay_rate * dt)`.
const DEFAULT_DECAY_BASE: f64 = 0.8;
/// Decay exponent per second.
const DEFAULT_DECAY_RATE: f64 = 60.0;
/// Half-width of the square impulse neighborhood, in cells.
const DEFAULT_IMPULSE_RADIUS: usize = 8;
/// Impulses longer than this are discarded.
const DEFAULT_MAX_IMPULSE: f64 = 20.0;
/// Additive guard in the transfer ratio `power / (eps + power)`.
const TRANSFER_EPSILON: f64 = 0.001;

/// `(cardinal, diagonal)` neighbor offsets per octant, as `(dx, dy)`.
/// Octant 0 spans angles `[0, 45°)` measured from +x towards +y (down).
const OCTANT_NEIGHBORS: [((isize, isize), (isize, isize)); 8] = [
    ((1, 0), (1, 1)),
    ((0, 1), (1, 1)),
    ((0, 1), (-1, 1)),
    ((-1, 0), (-1, 1)),
    ((-1, 0), (-1, -1)),
    ((0, -1), (-1, -1)),
    ((0, -1), (1, -1)),
    ((1, 0), (1, -1)),
];

/// Tunable constants of the wind stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindParams {
    pub decay_base: f64,
    pub decay_rate: f64,
    pub impulse_radius: usize,
    pub max_impulse: f64,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            decay_base: DEFAULT_DECAY_BASE,
            decay_rate: DEFAULT_DECAY_RATE,
            impulse_radius: DEFAULT_IMPULSE_RADIUS,
            max_impulse: DEFAULT_MAX_IMPULSE,
        }
    }
}

impl WindParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        Self {
            decay_base: param_f64(params, "decay_base", DEFAULT_DECAY_BASE),
            decay_rate: param_f64(params, "decay_rate", DEFAULT_DECAY_RATE),
            impulse_radius: param_usize(params, "impulse_radius", DEFAULT_IMPULSE_RADIUS),
            max_impulse: param_f64(params, "max_impulse", DEFAULT_MAX_IMPULSE),
        }
    }
}

/// Splits a heading into its octant and the share that goes to the
/// cardinal neighbor (the rest goes to the diagonal one).
fn octant_split(dir: DVec2) -> (usize, f64) {
    let scaled = (dir.heading() * 4.0 / PI).rem_euclid(8.0);
    let octant = (scaled.floor() as usize).min(7);
    let fraction = scaled - octant as f64;
    let progress = if octant % 2 == 0 {
        1.0 - fraction
    } else {
        fraction
    };
    (octant, progress)
}

fn deposit(grid: &mut VectorGrid, x: isize, y: isize, offset: (isize, isize), amount: DVec2) {
    if let Some(cell) = grid.get_mut(x + offset.0, y + offset.1) {
        *cell += amount;
    }
}

/// Wind stage: injects impulses and advects the field.
#[derive(Debug, Clone, Default)]
pub struct WindSimulator {
    params: WindParams,
    scratch: Option<VectorGrid>,
}

impl WindSimulator {
    pub fn new(params: WindParams) -> Self {
        Self {
            params,
            scratch: None,
        }
    }

    pub fn from_json(params: &Value) -> Self {
        Self::new(WindParams::from_json(params))
    }

    pub fn wind_params(&self) -> &WindParams {
        &self.params
    }

    /// Adds `direction / (1 + d²)` to every in-grid cell of the square
    /// neighborhood around `floor(origin)`, `d` being the distance to that cell.
    ///
    /// Returns `false` and leaves the field untouched when the impulse is
    /// longer than `max_impulse` or either vector is not finite.
    pub fn inject_impulse(&self, wind: &mut VectorGrid, origin: DVec2, direction: DVec2) -> bool {
        let magnitude = direction.length();
        if !origin.is_finite() || !magnitude.is_finite() || magnitude > self.params.max_impulse {
            trace!(
                x = origin.x,
                y = origin.y,
                magnitude,
                "impulse rejected"
            );
            return false;
        }
        let center = origin.floor();
        let (cx, cy) = (center.x as isize, center.y as isize);
        let r = self.params.impulse_radius.min(isize::MAX as usize / 2) as isize;
        // Only the part of the window inside the grid is visited.
        let (w, h) = (wind.width() as isize, wind.height() as isize);
        let (x0, x1) = (cx.saturating_sub(r).max(0), cx.saturating_add(r).min(w - 1));
        let (y0, y1) = (cy.saturating_sub(r).max(0), cy.saturating_add(r).min(h - 1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = ((x - cx) as f64, (y - cy) as f64);
                if let Some(cell) = wind.get_mut(x, y) {
                    *cell += direction / (1.0 + dx * dx + dy * dy);
                }
            }
        }
        true
    }

    /// Advances the field by `dt` seconds. Negative `dt` is treated as zero.
    ///
    /// Each non-zero cell keeps `dir - move` and sends `move * loss`, split
    /// between its octant's two neighbors, into a separate next-state grid.
    /// Shares that would leave the grid are dropped.
    pub fn advance(&mut self, wind: &mut VectorGrid, dt: f64) -> Result<(), SwayError> {
        let dt = dt.max(0.0);
        let mut next = match self.scratch.take() {
            Some(grid) if grid.same_shape(wind) => grid,
            _ => VectorGrid::new(wind.width(), wind.height())?,
        };
        next.fill(DVec2::ZERO);

        let loss = self.params.decay_base.powf(self.params.decay_rate * dt);
        let transfer_exponent = 2.0 / dt;

        for (x, y, &dir) in wind.iter() {
            let power = dir.length();
            if power == 0.0 {
                continue;
            }
            let (x, y) = (x as isize, y as isize);
            let (octant, progress) = octant_split(dir);
            let moved = dir * (power / (TRANSFER_EPSILON + power)).powf(transfer_exponent);

            deposit(&mut next, x, y, (0, 0), dir - moved);
            let (cardinal, diagonal) = OCTANT_NEIGHBORS[octant];
            deposit(&mut next, x, y, cardinal, moved * progress * loss);
            deposit(&mut next, x, y, diagonal, moved * (1.0 - progress) * loss);
        }

        std::mem::swap(wind, &mut next);
        self.scratch = Some(next);
        Ok(())
    }
}

impl Stage for WindSimulator {
    fn name(&self) -> &'static str {
        "wind"
    }

    fn step(&mut self, state: &mut SimulationState, dt: f64) -> Result<(), SwayError> {
        self.advance(&mut state.wind, dt)
    }

    fn params(&self) -> Value {
        json!({
            "decay_base": self.params.decay_base,
            "decay_rate": self.params.decay_rate,
            "impulse_radius": self.params.impulse_radius,
            "max_impulse": self.params.max_impulse,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "decay_base": {
                "type": "number",
                "default": DEFAULT_DECAY_BASE,
                "min": 0.0,
                "max": 1.0,
                "description": "Base of the per-tick wind decay"
            },
            "decay_rate": {
                "type": "number",
                "default": DEFAULT_DECAY_RATE,
                "min": 0.0,
                "max": 240.0,
                "description": "Decay exponent per second"
            },
            "impulse_radius": {
                "type": "integer",
                "default": DEFAULT_IMPULSE_RADIUS,
                "min": 0,
                "max": 32,
                "description": "Half-width of the square impulse neighborhood in cells"
            },
            "max_impulse": {
                "type": "number",
                "default": DEFAULT_MAX_IMPULSE,
                "min": 0.0,
                "max": 100.0,
                "description": "Impulses longer than this are discarded"
            }
        })
    }

    fn reset(&mut self) {
        self.scratch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    const DT: f64 = 1.0 / 60.0;

    fn field(w: usize, h: usize) -> VectorGrid {
        VectorGrid::new(w, h).unwrap()
    }

    fn at(grid: &VectorGrid, x: isize, y: isize) -> DVec2 {
        *grid.get(x, y).unwrap()
    }

    /// Fraction of a unit vector's length that moves at `DT`.
    fn unit_transfer() -> f64 {
        (1.0 / (1.0 + TRANSFER_EPSILON)).powf(2.0 / DT)
    }

    // ---- Impulse injection ----

    #[test]
    fn impulse_falls_off_with_squared_distance() {
        let sim = WindSimulator::default();
        let mut wind = field(30, 30);
        assert!(sim.inject_impulse(&mut wind, DVec2::new(10.7, 10.2), DVec2::new(2.0, 0.0)));
        assert!((at(&wind, 10, 10).x - 2.0).abs() < 1e-12);
        assert!((at(&wind, 11, 10).x - 1.0).abs() < 1e-12);
        assert!((at(&wind, 13, 14).x - 2.0 / 26.0).abs() < 1e-12);
        // The neighborhood is a square: corners of the window are reached.
        assert!((at(&wind, 18, 18).x - 2.0 / 129.0).abs() < 1e-12);
        assert_eq!(at(&wind, 19, 10), DVec2::ZERO);
        assert_eq!(at(&wind, 10, 1), DVec2::ZERO);
    }

    #[test]
    fn oversized_impulse_is_rejected_and_field_unchanged() {
        let sim = WindSimulator::default();
        let mut wind = field(10, 10);
        sim.inject_impulse(&mut wind, DVec2::new(2.0, 2.0), DVec2::new(0.5, 0.5));
        let before = wind.clone();
        assert!(!sim.inject_impulse(&mut wind, DVec2::new(5.0, 5.0), DVec2::new(15.0, 20.0)));
        assert_eq!(wind, before);
    }

    #[test]
    fn impulse_at_threshold_is_accepted() {
        let sim = WindSimulator::default();
        let mut wind = field(10, 10);
        assert!(sim.inject_impulse(&mut wind, DVec2::new(5.0, 5.0), DVec2::new(12.0, 16.0)));
        assert!(wind.total_power() > 0.0);
    }

    #[test]
    fn non_finite_impulse_is_rejected() {
        let sim = WindSimulator::default();
        let mut wind = field(4, 4);
        assert!(!sim.inject_impulse(&mut wind, DVec2::new(f64::NAN, 1.0), DVec2::X));
        assert!(!sim.inject_impulse(&mut wind, DVec2::ONE, DVec2::new(f64::INFINITY, 0.0)));
        assert_eq!(wind.total_power(), 0.0);
    }

    #[test]
    fn corner_impulse_stays_in_bounds_and_is_weaker_than_open_impulse() {
        let sim = WindSimulator::default();
        let dir = DVec2::new(1.0, -1.0);
        let mut corner = field(40, 40);
        let mut open = field(40, 40);
        assert!(sim.inject_impulse(&mut corner, DVec2::new(0.2, 0.9), dir));
        assert!(sim.inject_impulse(&mut open, DVec2::new(20.0, 20.0), dir));
        assert!(corner.energy() < open.energy());

        let mut far = field(5, 5);
        assert!(sim.inject_impulse(&mut far, DVec2::new(-3.5, 7.0), dir));
        assert!(sim.inject_impulse(&mut far, DVec2::new(1e18, -1e18), dir));
        assert!(far.is_finite());
    }

    #[test]
    fn huge_radius_only_visits_the_grid() {
        let sim = WindSimulator::new(WindParams {
            impulse_radius: 1_000_000,
            ..WindParams::default()
        });
        let mut wind = field(20, 12);
        assert!(sim.inject_impulse(&mut wind, DVec2::new(3.0, 4.0), DVec2::Y));
        assert!((at(&wind, 3, 4).y - 1.0).abs() < 1e-12);
        assert!((at(&wind, 19, 11).y - 1.0 / (1.0 + 256.0 + 49.0)).abs() < 1e-12);
        assert!((at(&wind, 0, 0).y - 1.0 / 26.0).abs() < 1e-12);
    }

    // ---- Advection ----

    #[test]
    fn zero_field_stays_zero() {
        let mut sim = WindSimulator::default();
        let mut wind = field(12, 7);
        for dt in [0.0, DT, 0.1, 1.0] {
            sim.advance(&mut wind, dt).unwrap();
            assert!(wind.data().iter().all(|v| *v == DVec2::ZERO));
        }
    }

    #[test]
    fn zero_dt_propagates_nothing() {
        let mut sim = WindSimulator::default();
        let mut wind = field(10, 10);
        sim.inject_impulse(&mut wind, DVec2::new(4.0, 6.0), DVec2::new(0.3, -0.7));
        let before = wind.clone();
        sim.advance(&mut wind, 0.0).unwrap();
        assert_eq!(wind, before);
        sim.advance(&mut wind, -0.5).unwrap();
        assert_eq!(wind, before);
    }

    #[test]
    fn eastward_cell_feeds_only_its_east_neighbor() {
        let mut sim = WindSimulator::default();
        let mut wind = field(5, 5);
        *wind.get_mut(2, 2).unwrap() = DVec2::X;
        sim.advance(&mut wind, DT).unwrap();

        let moved = unit_transfer();
        let loss = 0.8_f64.powf(60.0 * DT);
        assert!((at(&wind, 2, 2).x - (1.0 - moved)).abs() < 1e-12);
        assert!((at(&wind, 3, 2).x - moved * loss).abs() < 1e-12);
        assert_eq!(at(&wind, 3, 3), DVec2::ZERO);
        let others = wind.total_power() - at(&wind, 2, 2).length() - at(&wind, 3, 2).length();
        assert!(others.abs() < 1e-12);
    }

    #[test]
    fn diagonal_cell_feeds_its_diagonal_neighbor() {
        let mut sim = WindSimulator::default();
        let mut wind = field(5, 5);
        let dir = DVec2::new(1.0, 1.0);
        *wind.get_mut(2, 2).unwrap() = dir;
        sim.advance(&mut wind, DT).unwrap();

        let moved = (2f64.sqrt() / (TRANSFER_EPSILON + 2f64.sqrt())).powf(2.0 / DT);
        let loss = 0.8_f64.powf(60.0 * DT);
        let expected = dir * moved * loss;
        assert!((at(&wind, 3, 3) - expected).length() < 1e-9);
        assert!(at(&wind, 3, 2).length() < 1e-9);
        assert!(at(&wind, 2, 3).length() < 1e-9);
    }

    #[test]
    fn mid_octant_splits_evenly_between_expected_neighbors() {
        let expected = [
            ((3, 2), (3, 3)),
            ((2, 3), (3, 3)),
            ((2, 3), (1, 3)),
            ((1, 2), (1, 3)),
            ((1, 2), (1, 1)),
            ((2, 1), (1, 1)),
            ((2, 1), (3, 1)),
            ((3, 2), (3, 1)),
        ];
        let loss = 0.8_f64.powf(60.0 * DT);
        for (octant, &(cardinal, diagonal)) in expected.iter().enumerate() {
            let angle = (octant as f64 + 0.5) * FRAC_PI_4;
            let dir = DVec2::new(angle.cos(), angle.sin());
            let mut sim = WindSimulator::default();
            let mut wind = field(5, 5);
            *wind.get_mut(2, 2).unwrap() = dir;
            sim.advance(&mut wind, DT).unwrap();

            let half = dir * unit_transfer() * loss * 0.5;
            let c = at(&wind, cardinal.0, cardinal.1);
            let d = at(&wind, diagonal.0, diagonal.1);
            assert!((c - half).length() < 1e-9, "octant {octant}: cardinal {c:?}");
            assert!((d - half).length() < 1e-9, "octant {octant}: diagonal {d:?}");
        }
    }

    #[test]
    fn wind_leaving_the_grid_is_dropped() {
        let mut sim = WindSimulator::default();
        let mut wind = field(3, 3);
        *wind.get_mut(2, 1).unwrap() = DVec2::X;
        sim.advance(&mut wind, DT).unwrap();
        assert!((wind.total_power() - (1.0 - unit_transfer())).abs() < 1e-12);
    }

    #[test]
    fn scratch_buffer_follows_field_shape() {
        let mut sim = WindSimulator::default();
        let mut small = field(3, 3);
        let mut large = field(8, 4);
        small.fill(DVec2::X * 0.1);
        large.fill(DVec2::Y * 0.1);
        sim.advance(&mut small, DT).unwrap();
        sim.advance(&mut large, DT).unwrap();
        assert_eq!((large.width(), large.height()), (8, 4));
        sim.reset();
        sim.advance(&mut small, DT).unwrap();
        assert_eq!((small.width(), small.height()), (3, 3));
    }

    #[test]
    fn impulse_scenario_falls_off_towards_row_zero() {
        let mut sim = WindSimulator::default();
        let mut wind = field(10, 10);
        sim.inject_impulse(&mut wind, DVec2::new(5.0, 5.0), DVec2::X);
        sim.advance(&mut wind, DT).unwrap();

        let column: Vec<f64> = (0..=5).rev().map(|row| at(&wind, 5, row).x).collect();
        assert!((column[0] - 0.4278).abs() < 1e-3, "center {}", column[0]);
        for pair in column.windows(2) {
            assert!(pair[1] < pair[0], "column 5 not decreasing: {column:?}");
        }
        // A purely eastward field never picks up a vertical component.
        assert!(wind.data().iter().all(|v| v.y == 0.0));
    }

    #[test]
    fn single_direction_impulse_energy_never_increases() {
        for dir in [
            DVec2::new(1.0, 0.0),
            DVec2::new(0.6, 0.8),
            DVec2::new(-0.3, 0.2),
            DVec2::new(0.0, -1.0),
        ] {
            let mut sim = WindSimulator::default();
            let mut wind = field(10, 10);
            sim.inject_impulse(&mut wind, DVec2::new(5.0, 5.0), dir);
            let mut energy = wind.energy();
            for tick in 0..120 {
                sim.advance(&mut wind, DT).unwrap();
                let next = wind.energy();
                assert!(
                    next <= energy + 1e-12,
                    "{dir:?}: energy rose at tick {tick}: {energy} -> {next}"
                );
                energy = next;
            }
        }
    }

    // ---- Stage trait ----

    #[test]
    fn from_json_uses_defaults_for_empty_json() {
        let sim = WindSimulator::from_json(&json!({}));
        assert_eq!(*sim.wind_params(), WindParams::default());
    }

    #[test]
    fn from_json_extracts_custom_values() {
        let sim = WindSimulator::from_json(&json!({
            "decay_base": 0.7,
            "decay_rate": 30,
            "impulse_radius": 4,
            "max_impulse": 10.0,
        }));
        let p = sim.params();
        assert!((p["decay_base"].as_f64().unwrap() - 0.7).abs() < f64::EPSILON);
        assert!((p["decay_rate"].as_f64().unwrap() - 30.0).abs() < f64::EPSILON);
        assert_eq!(p["impulse_radius"], 4);
        assert!((p["max_impulse"].as_f64().unwrap() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_schema_lists_every_parameter() {
        let sim = WindSimulator::default();
        let schema = sim.param_schema();
        for key in ["decay_base", "decay_rate", "impulse_radius", "max_impulse"] {
            assert!(schema[key].get("type").is_some(), "{key} missing 'type'");
            assert!(schema[key].get("default").is_some(), "{key} missing 'default'");
            assert!(schema[key].get("description").is_some(), "{key} missing 'description'");
        }
    }

    #[test]
    fn stage_step_advances_state_wind() {
        let pixels = windsway_core::Grid::filled(6, 6, windsway_core::Rgba8::opaque(120, 80, 40))
            .unwrap();
        let mut state =
            SimulationState::new(pixels, windsway_core::ClassifierRules::default()).unwrap();
        let mut stage: Box<dyn Stage> = Box::new(WindSimulator::default());
        *state.wind.get_mut(1, 1).unwrap() = DVec2::X;
        stage.step(&mut state, DT).unwrap();
        assert!(at(&state.wind, 2, 1).x > 0.0);
        assert_eq!(stage.name(), "wind");
    }

    // ---- Property-based tests ----

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn wind_field() -> impl Strategy<Value = VectorGrid> {
            (2_usize..=12, 2_usize..=12).prop_flat_map(|(w, h)| {
                prop::collection::vec((-3.0_f64..3.0, -3.0_f64..3.0), w * h).prop_map(
                    move |cells| {
                        let data = cells.into_iter().map(|(x, y)| DVec2::new(x, y)).collect();
                        VectorGrid::from_data(w, h, data).unwrap()
                    },
                )
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn total_power_never_increases(mut wind in wind_field(), dt in 0.0_f64..0.1) {
                let mut sim = WindSimulator::default();
                let before = wind.total_power();
                sim.advance(&mut wind, dt).unwrap();
                let after = wind.total_power();
                prop_assert!(after <= before * (1.0 + 1e-12) + 1e-12, "{before} -> {after}");
                prop_assert!(wind.is_finite());
            }

            #[test]
            fn impulse_anywhere_stays_finite(
                x in -30.0_f64..30.0,
                y in -30.0_f64..30.0,
                dx in -14.0_f64..14.0,
                dy in -14.0_f64..14.0,
            ) {
                let sim = WindSimulator::default();
                let mut wind = field(10, 10);
                prop_assert!(sim.inject_impulse(&mut wind, DVec2::new(x, y), DVec2::new(dx, dy)));
                prop_assert!(wind.is_finite());
            }
        }
    }
}
