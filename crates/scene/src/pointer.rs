//! Pointer and touch tracking.
//!
//! Each pointer id remembers its last screen position. The first sample of
//! an id only records it; later samples turn the screen delta into a wind
//! impulse in grid space. Pointers that stop reporting are forgotten after
//! a number of frames so a stale position never produces a huge jump.

use std::collections::HashMap;

use glam::DVec2;
use tracing::trace;

use crate::projector::Projector;

/// Caller-chosen pointer identifier (mouse, touch slot, ...).
pub type PointerId = u64;

/// A grid-space impulse ready for injection into the wind field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub origin: DVec2,
    pub direction: DVec2,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    last: DVec2,
    seen_frame: u64,
}

#[derive(Debug, Clone)]
pub struct PointerTracker {
    forget_after_frames: u64,
    frame: u64,
    tracks: HashMap<PointerId, Track>,
}

impl PointerTracker {
    pub fn new(forget_after_frames: u64) -> Self {
        Self {
            forget_after_frames,
            frame: 0,
            tracks: HashMap::new(),
        }
    }

    /// Records a sample and returns the impulse it produces, if any.
    ///
    /// The impulse is applied behind the pointer, at `prev - delta`, and
    /// points along the motion scaled to grid units and by `multiplier`.
    pub fn sample(
        &mut self,
        id: PointerId,
        screen: DVec2,
        multiplier: f64,
        projector: &Projector,
    ) -> Option<Impulse> {
        let frame = self.frame;
        let track = self.tracks.entry(id).or_insert(Track {
            last: screen,
            seen_frame: frame,
        });
        let prev = track.last;
        track.last = screen;
        track.seen_frame = frame;

        let delta = screen - prev;
        if delta == DVec2::ZERO {
            return None;
        }
        Some(Impulse {
            origin: projector.to_grid(prev - delta),
            direction: delta / projector.unit() * multiplier,
        })
    }

    /// Forgets `id` at once. Returns whether it was tracked.
    pub fn release(&mut self, id: PointerId) -> bool {
        self.tracks.remove(&id).is_some()
    }

    /// Advances the frame counter and drops pointers idle for longer than
    /// `forget_after_frames`. Returns how many were dropped.
    pub fn end_frame(&mut self) -> usize {
        self.frame += 1;
        let (frame, limit) = (self.frame, self.forget_after_frames);
        let before = self.tracks.len();
        self.tracks.retain(|id, track| {
            let keep = frame - track.seen_frame <= limit;
            if !keep {
                trace!(pointer = *id, "pointer forgotten");
            }
            keep
        });
        before - self.tracks.len()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn is_tracking(&self, id: PointerId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector() -> Projector {
        // unit 9, sprite origin at (55, 10)
        Projector::new(200, 100, 10, 10)
    }

    #[test]
    fn first_sample_only_records_position() {
        let mut tracker = PointerTracker::new(30);
        assert!(tracker.sample(1, DVec2::new(80.0, 50.0), 1.0, &projector()).is_none());
        assert!(tracker.is_tracking(1));
    }

    #[test]
    fn second_sample_produces_impulse_behind_the_pointer() {
        let mut tracker = PointerTracker::new(30);
        let p = projector();
        tracker.sample(1, DVec2::new(82.0, 46.0), 1.0, &p);
        let impulse = tracker
            .sample(1, DVec2::new(91.0, 46.0), 2.0, &p)
            .unwrap();
        // prev - delta = (73, 46) -> grid ((73 - 55) / 9, (46 - 10) / 9)
        assert!((impulse.origin - DVec2::new(2.0, 4.0)).length() < 1e-12);
        assert!((impulse.direction - DVec2::new(2.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn unmoved_pointer_produces_nothing() {
        let mut tracker = PointerTracker::new(30);
        let p = projector();
        tracker.sample(3, DVec2::new(10.0, 10.0), 1.0, &p);
        assert!(tracker.sample(3, DVec2::new(10.0, 10.0), 1.0, &p).is_none());
    }

    #[test]
    fn pointers_are_tracked_independently() {
        let mut tracker = PointerTracker::new(30);
        let p = projector();
        tracker.sample(1, DVec2::new(60.0, 60.0), 1.0, &p);
        assert!(tracker.sample(2, DVec2::new(90.0, 60.0), 1.0, &p).is_none());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn release_forgets_immediately() {
        let mut tracker = PointerTracker::new(30);
        let p = projector();
        tracker.sample(5, DVec2::new(60.0, 60.0), 1.0, &p);
        assert!(tracker.release(5));
        assert!(!tracker.release(5));
        assert!(tracker.sample(5, DVec2::new(90.0, 60.0), 1.0, &p).is_none());
    }

    #[test]
    fn idle_pointers_are_forgotten_after_the_limit() {
        let mut tracker = PointerTracker::new(2);
        let p = projector();
        tracker.sample(1, DVec2::new(60.0, 60.0), 1.0, &p);
        tracker.sample(2, DVec2::new(60.0, 60.0), 1.0, &p);
        assert_eq!(tracker.end_frame(), 0);
        tracker.sample(2, DVec2::new(61.0, 60.0), 1.0, &p);
        assert_eq!(tracker.end_frame(), 0);
        assert_eq!(tracker.end_frame(), 1);
        assert!(!tracker.is_tracking(1));
        assert!(tracker.is_tracking(2));
        assert_eq!(tracker.end_frame(), 1);
        assert!(tracker.is_empty());
    }
}
