//! Convergence easing
//!
//! Values do not tween over a fixed duration. Every step moves a value a fixed
//! fraction of the remaining distance toward its target (halving by default),
//! which decays exponentially and decelerates near arrival. Once the gap drops
//! below epsilon the value snaps exactly onto the target.

use glam::Vec2;

use crate::axis_gap;

/// Fraction of the remaining distance kept per step when halving
pub const HALVING: f32 = 0.5;

/// A quantity that can be eased toward a target
pub trait Approach: Copy + PartialEq {
    /// Distance used for the epsilon test (largest axis for vectors)
    fn gap(self, target: Self) -> f32;
    /// Move toward `target`, keeping `retain` of the remaining distance
    fn toward(self, target: Self, retain: f32) -> Self;
}

impl Approach for f32 {
    #[inline]
    fn gap(self, target: Self) -> f32 {
        (self - target).abs()
    }

    #[inline]
    fn toward(self, target: Self, retain: f32) -> Self {
        target + (self - target) * retain
    }
}

impl Approach for Vec2 {
    #[inline]
    fn gap(self, target: Self) -> f32 {
        axis_gap(self, target)
    }

    #[inline]
    fn toward(self, target: Self, retain: f32) -> Self {
        target + (self - target) * retain
    }
}

/// Outcome of a single easing step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<T> {
    /// Still converging; holds the new value
    Moving(T),
    /// Snapped onto the target
    Arrived(T),
}

impl<T: Copy> Step<T> {
    pub fn value(&self) -> T {
        match *self {
            Step::Moving(v) | Step::Arrived(v) => v,
        }
    }

    pub fn is_arrived(&self) -> bool {
        matches!(self, Step::Arrived(_))
    }
}

/// One halving step from `current` toward `target`
pub fn approach<T: Approach>(current: T, target: T, epsilon: f32) -> Step<T> {
    approach_with(current, target, epsilon, HALVING)
}

/// One step keeping `retain` of the remaining distance
///
/// A step that fails to shrink the gap (float resolution exhausted) snaps to
/// the target, so every sequence of steps terminates.
pub fn approach_with<T: Approach>(current: T, target: T, epsilon: f32, retain: f32) -> Step<T> {
    let gap = current.gap(target);
    if !(gap >= epsilon) {
        return Step::Arrived(target);
    }
    let next = current.toward(target, retain);
    if next == current || !(next.gap(target) < gap) {
        return Step::Arrived(target);
    }
    Step::Moving(next)
}

/// Easing state for one quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolator<T> {
    current: T,
    target: T,
    epsilon: f32,
    retain: f32,
}

impl<T: Approach> Interpolator<T> {
    pub fn new(current: T, target: T, epsilon: f32) -> Self {
        Self {
            current,
            target,
            epsilon,
            retain: HALVING,
        }
    }

    /// Use a different per-step retain ratio (fades use 1/1.5)
    pub fn with_retain(mut self, retain: f32) -> Self {
        self.retain = retain;
        self
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn target(&self) -> T {
        self.target
    }

    /// Keep the current value, aim somewhere else
    pub fn retarget(&mut self, target: T) {
        self.target = target;
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    pub fn step(&mut self) -> Step<T> {
        let step = approach_with(self.current, self.target, self.epsilon, self.retain);
        self.current = step.value();
        step
    }
}

/// An interpolator stepped on its own cadence
///
/// The animation frame hands every tween the elapsed time; a tween only steps
/// once a full period has accumulated, so quantities with different cadences
/// (position 20 ms, scale 40 ms) share one frame clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T> {
    interp: Interpolator<T>,
    period_ms: u32,
    elapsed_ms: u32,
    arrived: bool,
}

impl<T: Approach> Tween<T> {
    pub fn new(interp: Interpolator<T>, period_ms: u32) -> Self {
        Self {
            interp,
            period_ms: period_ms.max(1),
            elapsed_ms: 0,
            arrived: false,
        }
    }

    pub fn target(&self) -> T {
        self.interp.target()
    }

    pub fn is_arrived(&self) -> bool {
        self.arrived
    }

    /// Aim at a new target without losing the accumulated cadence
    pub fn retarget(&mut self, target: T) {
        self.interp.retarget(target);
        self.arrived = false;
    }

    /// Advance the cadence clock; returns the latest step if any was due
    pub fn tick(&mut self, dt_ms: u32) -> Option<Step<T>> {
        if self.arrived {
            return None;
        }
        self.elapsed_ms += dt_ms;
        let mut last = None;
        while self.elapsed_ms >= self.period_ms {
            self.elapsed_ms -= self.period_ms;
            let step = self.interp.step();
            last = Some(step);
            if step.is_arrived() {
                self.arrived = true;
                self.elapsed_ms = 0;
                break;
            }
        }
        last
    }
}
