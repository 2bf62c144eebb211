//! The per-frame driver: owns the state and the three stages, queues
//! pointer impulses, and runs wind → spring → particles each tick.

use glam::DVec2;
use serde_json::Value;
use tracing::{debug, info};
use windsway_core::{
    Classification, Grid, PixelBuffer, SimulationState, Stage, SwayError, VectorGrid, Xorshift64,
};
use windsway_particles::{Particle, ParticleSystem};
use windsway_spring::SpringSimulator;
use windsway_wind::WindSimulator;

use crate::config::SceneConfig;
use crate::ground::{generate_ground, GroundTile};
use crate::pointer::{Impulse, PointerId, PointerTracker};
use crate::projector::Projector;

/// A loaded sprite and everything needed to animate it.
///
/// A `Simulation` always holds an image; [`Simulation::load_image`] swaps it
/// and restarts the loop.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SceneConfig,
    state: SimulationState,
    wind: WindSimulator,
    spring: SpringSimulator,
    particles: ParticleSystem,
    pointers: PointerTracker,
    pending: Vec<Impulse>,
    projector: Projector,
    ground_rng: Xorshift64,
    ground: Option<Grid<GroundTile>>,
    running: bool,
    last_time: Option<f64>,
    ticks: u64,
}

impl Simulation {
    /// Classifies `pixels`, builds every grid, and starts the loop.
    ///
    /// Fails with `SwayError::InvalidConfig` when a value is outside its
    /// schema range.
    pub fn new(
        pixels: PixelBuffer,
        config: SceneConfig,
        canvas_width: usize,
        canvas_height: usize,
    ) -> Result<Self, SwayError> {
        config.validate()?;
        let projector = Projector::new(canvas_width, canvas_height, pixels.width(), pixels.height());
        let state = SimulationState::new(pixels, config.classifier.clone())?;
        let mut sim = Self {
            wind: WindSimulator::new(config.wind),
            spring: SpringSimulator::new(config.spring),
            particles: ParticleSystem::new(config.particles, config.seed),
            pointers: PointerTracker::new(config.pointer.forget_after_frames),
            pending: Vec::new(),
            projector,
            ground_rng: Xorshift64::new(config.seed.wrapping_add(1)),
            ground: None,
            running: false,
            last_time: None,
            ticks: 0,
            state,
            config,
        };
        sim.regenerate_ground()?;
        sim.start();
        Ok(sim)
    }

    /// Replaces the sprite: grids, classification, particles, pointers and
    /// ground all start over, and the loop restarts.
    pub fn load_image(&mut self, pixels: PixelBuffer) -> Result<(), SwayError> {
        let (cw, ch) = self.projector.canvas_size();
        self.projector = Projector::new(cw, ch, pixels.width(), pixels.height());
        self.state.replace_image(pixels)?;
        self.wind.reset();
        self.spring.reset();
        self.particles.reset();
        self.pointers.clear();
        self.pending.clear();
        self.ticks = 0;
        self.regenerate_ground()?;
        self.start();
        Ok(())
    }

    fn regenerate_ground(&mut self) -> Result<(), SwayError> {
        let g = self.config.ground;
        self.ground = if g.enabled {
            let width = self.state.width() * g.width_factor;
            Some(generate_ground(width, g.min_height, g.max_height, &mut self.ground_rng)?)
        } else {
            None
        };
        Ok(())
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_time = None;
        info!(
            width = self.state.width(),
            height = self.state.height(),
            "simulation started"
        );
    }

    /// Halts the loop; queued impulses and tracked pointers are discarded.
    pub fn stop(&mut self) {
        if self.running {
            info!(ticks = self.ticks, "simulation stopped");
        }
        self.running = false;
        self.pending.clear();
        self.pointers.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Runs one tick for wall-clock time `now` (seconds). The first frame
    /// after a start only records the time.
    ///
    /// Returns `Ok(false)` without doing anything while stopped.
    pub fn frame(&mut self, now: f64) -> Result<bool, SwayError> {
        if !self.running {
            return Ok(false);
        }
        let dt = match self.last_time {
            Some(last) => self.config.frame.frame_dt(now - last),
            None => 0.0,
        };
        self.last_time = Some(now);
        self.tick(dt)?;
        Ok(true)
    }

    /// Drains queued impulses, then steps wind, spring and particles by `dt`.
    pub fn tick(&mut self, dt: f64) -> Result<(), SwayError> {
        self.state.refresh();
        let mut rejected = 0;
        for impulse in self.pending.drain(..) {
            if !self
                .wind
                .inject_impulse(&mut self.state.wind, impulse.origin, impulse.direction)
            {
                rejected += 1;
            }
        }
        if rejected > 0 {
            debug!(rejected, "impulses rejected this tick");
        }
        let stages: [&mut dyn Stage; 3] = [&mut self.wind, &mut self.spring, &mut self.particles];
        for stage in stages {
            stage.step(&mut self.state, dt)?;
        }
        self.pointers.end_frame();
        self.ticks += 1;
        Ok(())
    }

    /// Feeds a pointer sample; queues an impulse for the next tick when the
    /// pointer moved since its previous sample. Ignored while stopped.
    pub fn pointer_move(&mut self, id: PointerId, screen: DVec2, multiplier: f64) -> bool {
        if !self.running {
            return false;
        }
        match self.pointers.sample(id, screen, multiplier, &self.projector) {
            Some(impulse) => {
                self.pending.push(impulse);
                true
            }
            None => false,
        }
    }

    pub fn pointer_release(&mut self, id: PointerId) -> bool {
        self.pointers.release(id)
    }

    /// Queues a grid-space impulse for the next tick. Returns `false` and
    /// drops it while stopped.
    pub fn inject(&mut self, origin: DVec2, direction: DVec2) -> bool {
        if self.running {
            self.pending.push(Impulse { origin, direction });
        }
        self.running
    }

    pub fn resize(&mut self, canvas_width: usize, canvas_height: usize) {
        self.projector = Projector::new(
            canvas_width,
            canvas_height,
            self.state.width(),
            self.state.height(),
        );
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.state.pixels
    }

    pub fn wind(&self) -> &VectorGrid {
        &self.state.wind
    }

    pub fn displacement(&self) -> &VectorGrid {
        &self.state.displacement
    }

    pub fn force(&self) -> &VectorGrid {
        &self.state.force
    }

    pub fn classification(&self) -> Result<&Classification, SwayError> {
        self.state.classification()
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.particles()
    }

    pub fn ground(&self) -> Option<&Grid<GroundTile>> {
        self.ground.as_ref()
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn pending_impulses(&self) -> &[Impulse] {
        &self.pending
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Current parameters of every section, in the shape
    /// [`SceneConfig::from_json`] reads.
    pub fn params(&self) -> Value {
        self.config.params()
    }

    pub fn param_schema(&self) -> Value {
        self.config.param_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windsway_core::{PixelCategory, Rgba8};

    const BARK: Rgba8 = Rgba8::opaque(120, 80, 40);
    const LEAF: Rgba8 = Rgba8::opaque(96, 160, 40);

    /// 10x10 sprite: leaf canopy in rows 0..4, bark below, transparent border column.
    fn tree() -> PixelBuffer {
        Grid::from_fn(10, 10, |x, y| match (x, y) {
            (0, _) => Rgba8::TRANSPARENT,
            (_, 0..=3) => LEAF,
            _ => BARK,
        })
        .unwrap()
    }

    fn sim() -> Simulation {
        Simulation::new(tree(), SceneConfig::default(), 200, 100).unwrap()
    }

    #[test]
    fn new_simulation_is_running_and_classified() {
        let sim = sim();
        assert!(sim.is_running());
        let counts = sim.classification().unwrap().counts();
        assert_eq!(counts[&PixelCategory::Empty], 10);
        assert_eq!(counts[&PixelCategory::Leaf], 36);
        assert_eq!(counts[&PixelCategory::Trunk], 54);
        let ground = sim.ground().unwrap();
        assert_eq!((ground.width(), ground.height()), (40, 5));
    }

    #[test]
    fn first_frame_only_records_time_then_dt_is_clamped() {
        let mut sim = sim();
        sim.inject(DVec2::new(5.0, 5.0), DVec2::X);
        assert!(sim.frame(10.0).unwrap());
        // dt = 0 on the first frame: the impulse landed but nothing moved.
        assert_eq!(sim.displacement().energy(), 0.0);
        assert!((sim.wind().get(5, 5).unwrap().x - 1.0).abs() < 1e-12);

        assert!(sim.frame(10.0 + 1.0 / 60.0).unwrap());
        assert!(sim.displacement().get(5, 5).unwrap().x > 0.0);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn stopped_simulation_ignores_frames() {
        let mut sim = sim();
        sim.inject(DVec2::new(5.0, 5.0), DVec2::X);
        sim.stop();
        assert!(!sim.frame(1.0).unwrap());
        assert_eq!(sim.tick_count(), 0);
        assert!(sim.pending_impulses().is_empty());
        sim.start();
        assert!(sim.frame(2.0).unwrap());
        assert_eq!(sim.wind().total_power(), 0.0);
    }

    #[test]
    fn out_of_range_config_is_refused() {
        let mut config = SceneConfig::default();
        config.frame.max_dt = -0.5;
        let err = Simulation::new(tree(), config, 200, 100).unwrap_err();
        assert!(matches!(err, SwayError::InvalidConfig(_)));
    }

    #[test]
    fn input_while_stopped_is_dropped() {
        let mut sim = sim();
        sim.pointer_move(0, DVec2::new(100.0, 55.0), 1.0);
        sim.stop();
        for i in 0..10_000 {
            let x = if i % 2 == 0 { 101.0 } else { 100.0 };
            assert!(!sim.pointer_move(0, DVec2::new(x, 55.0), 1.0));
        }
        assert!(!sim.inject(DVec2::new(5.0, 5.0), DVec2::X));
        assert!(sim.pending_impulses().is_empty());

        sim.start();
        sim.frame(0.0).unwrap();
        assert_eq!(sim.wind().total_power(), 0.0);
        // The pointer was forgotten on stop, so its next sample only records.
        assert!(!sim.pointer_move(0, DVec2::new(120.0, 55.0), 1.0));
        assert!(sim.pointer_move(0, DVec2::new(125.0, 55.0), 1.0));
    }

    #[test]
    fn pointer_drag_pushes_wind_along_the_motion() {
        let mut sim = sim();
        // unit 9, sprite origin (55, 10)
        assert!(!sim.pointer_move(0, DVec2::new(100.0, 55.0), 1.0));
        assert!(sim.pointer_move(0, DVec2::new(109.0, 55.0), 1.0));
        sim.tick(1.0 / 60.0).unwrap();
        let total: DVec2 = sim.wind().data().iter().copied().sum();
        assert!(total.x > 0.0);
        assert!(total.y.abs() < 1e-12);
    }

    #[test]
    fn violent_drag_is_rejected() {
        let mut sim = sim();
        sim.pointer_move(0, DVec2::new(0.0, 55.0), 1.0);
        sim.pointer_move(0, DVec2::new(199.0, 55.0), 1.0);
        sim.tick(1.0 / 60.0).unwrap();
        assert_eq!(sim.wind().total_power(), 0.0);
    }

    #[test]
    fn released_pointer_starts_over() {
        let mut sim = sim();
        sim.pointer_move(4, DVec2::new(100.0, 55.0), 1.0);
        assert!(sim.pointer_release(4));
        assert!(!sim.pointer_move(4, DVec2::new(120.0, 55.0), 1.0));
    }

    #[test]
    fn load_image_resets_everything() {
        let mut sim = sim();
        sim.inject(DVec2::new(5.0, 5.0), DVec2::new(3.0, 0.0));
        for i in 0..20 {
            sim.frame(i as f64 / 30.0).unwrap();
        }
        sim.stop();
        sim.inject(DVec2::new(1.0, 1.0), DVec2::X);

        let small = Grid::filled(4, 6, BARK).unwrap();
        sim.load_image(small).unwrap();
        assert!(sim.is_running());
        assert_eq!((sim.wind().width(), sim.wind().height()), (4, 6));
        assert_eq!(sim.wind().total_power(), 0.0);
        assert!(sim.particles().is_empty());
        assert!(sim.pending_impulses().is_empty());
        assert_eq!(sim.classification().unwrap().counts()[&PixelCategory::Trunk], 24);
        assert_eq!(sim.ground().unwrap().width(), 16);
        sim.tick(0.05).unwrap();
    }

    #[test]
    fn resize_changes_projection_only() {
        let mut sim = sim();
        sim.resize(1000, 1000);
        assert_eq!(sim.projector().unit(), 90.0);
        assert_eq!(sim.wind().width(), 10);
    }

    #[test]
    fn disabled_ground_is_absent() {
        let mut config = SceneConfig::default();
        config.ground.enabled = false;
        let sim = Simulation::new(tree(), config, 100, 100).unwrap();
        assert!(sim.ground().is_none());
    }

    #[test]
    fn params_and_schema_cover_every_stage() {
        let sim = sim();
        let params = sim.params();
        let schema = sim.param_schema();
        for stage in ["wind", "spring", "particles", "frame"] {
            assert!(params.get(stage).is_some(), "params missing {stage}");
            assert!(schema.get(stage).is_some(), "schema missing {stage}");
        }
        assert_eq!(params["seed"], 1);
    }

    #[test]
    fn long_windy_run_stays_finite() {
        let mut sim = sim();
        for i in 0..300 {
            if i % 10 == 0 {
                let x = (i / 10) as f64 * 5.0 + 55.0;
                sim.pointer_move(1, DVec2::new(x, 40.0), 2.0);
            }
            sim.tick(1.0 / 60.0).unwrap();
        }
        assert!(sim.wind().is_finite());
        assert!(sim.displacement().is_finite());
        assert!(sim.force().is_finite());
        assert!(sim.particles().iter().all(|p| p.position.is_finite()));
    }

    #[test]
    fn same_seed_same_animation() {
        let run = || {
            let mut sim = sim();
            for _ in 0..60 {
                sim.inject(DVec2::new(5.0, 2.0), DVec2::new(4.0, 1.0));
                sim.tick(1.0 / 30.0).unwrap();
            }
            (sim.particles().to_vec(), sim.displacement().clone())
        };
        assert_eq!(run(), run());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn drag() -> impl Strategy<Value = Vec<(u64, f64, f64)>> {
            prop::collection::vec((0_u64..3, 0.0_f64..200.0, 0.0_f64..100.0), 1..40)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn random_pointer_input_keeps_every_field_finite(
                samples in drag(),
                dt in 0.0_f64..0.1,
            ) {
                let mut sim = sim();
                for (id, x, y) in samples {
                    sim.pointer_move(id, DVec2::new(x, y), 1.5);
                    sim.tick(dt).unwrap();
                }
                prop_assert!(sim.wind().is_finite());
                prop_assert!(sim.displacement().is_finite());
                prop_assert!(sim.force().is_finite());
                prop_assert!(sim.pending_impulses().is_empty());
                prop_assert!(sim.particles().len() <= sim.config().particles.max_particles);
            }
        }
    }
}
