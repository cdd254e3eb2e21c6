//! Cooperative timers
//!
//! Nothing in the core blocks or sleeps. Recurring work (conveyor advance,
//! animation frames, the score clock) and one-shot delays are registered with
//! a `Scheduler` as plain `Job` values; the driver pulls due jobs off the
//! `Timeline` in time order and dispatches them.

/// Work a timer triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Start the conveyor (after the level intro delay)
    Start,
    /// Shift the conveyor one slot
    Advance,
    /// Step every in-flight tween
    Animate,
    /// Advance the score clock
    ScoreTick,
}

/// Cancelable reference to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Timer registration capability
pub trait Scheduler {
    /// Run `job` every `period_ms`, first after one full period
    fn every(&mut self, period_ms: u32, job: Job) -> TimerHandle;
    /// Run `job` once after `delay_ms`
    fn after(&mut self, delay_ms: u32, job: Job) -> TimerHandle;
    /// Returns false if the timer had already fired or been canceled
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    due_ms: u64,
    period_ms: Option<u32>,
    job: Job,
}

/// Deterministic virtual-time scheduler
///
/// Timers due at the same instant fire in registration order.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    now_ms: u64,
    next_handle: u64,
    timers: Vec<Timer>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn register(&mut self, delay_ms: u32, period_ms: Option<u32>, job: Job) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.push(Timer {
            handle,
            due_ms: self.now_ms + delay_ms as u64,
            period_ms,
            job,
        });
        handle
    }

    /// Pop the earliest job due at or before `until_ms`
    ///
    /// Virtual time moves to the job's due time, so jobs scheduled while
    /// dispatching are timed from the moment they were scheduled.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, Job)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.handle))
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        self.now_ms = self.now_ms.max(timer.due_ms);
        let fired = (timer.handle, timer.job);
        let period = timer.period_ms;
        match period {
            Some(period) => self.timers[idx].due_ms += period as u64,
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(fired)
    }

    /// Move virtual time forward once every due job has been popped
    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

impl Scheduler for Timeline {
    fn every(&mut self, period_ms: u32, job: Job) -> TimerHandle {
        let period = period_ms.max(1);
        self.register(period, Some(period), job)
    }

    fn after(&mut self, delay_ms: u32, job: Job) -> TimerHandle {
        self.register(delay_ms, None, job)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timeline: &mut Timeline, until: u64) -> Vec<(u64, Job)> {
        let mut fired = Vec::new();
        while let Some((_, job)) = timeline.pop_due(until) {
            fired.push((timeline.now_ms(), job));
        }
        timeline.advance_to(until);
        fired
    }

    #[test]
    fn test_every_repeats_on_period() {
        let mut tl = Timeline::new();
        tl.every(20, Job::Advance);
        let fired = drain(&mut tl, 70);
        assert_eq!(
            fired,
            vec![(20, Job::Advance), (40, Job::Advance), (60, Job::Advance)]
        );
        assert_eq!(tl.now_ms(), 70);
    }

    #[test]
    fn test_after_fires_once() {
        let mut tl = Timeline::new();
        let h = tl.after(50, Job::Start);
        assert!(tl.is_scheduled(h));
        assert_eq!(drain(&mut tl, 200), vec![(50, Job::Start)]);
        assert!(!tl.is_scheduled(h));
        assert!(!tl.cancel(h));
    }

    #[test]
    fn test_same_instant_fires_in_registration_order() {
        let mut tl = Timeline::new();
        tl.every(40, Job::Advance);
        tl.every(20, Job::Animate);
        let fired = drain(&mut tl, 40);
        assert_eq!(
            fired,
            vec![(20, Job::Animate), (40, Job::Advance), (40, Job::Animate)]
        );
    }

    #[test]
    fn test_cancel_stops_recurring_timer() {
        let mut tl = Timeline::new();
        let h = tl.every(10, Job::ScoreTick);
        assert_eq!(drain(&mut tl, 25).len(), 2);
        assert!(tl.cancel(h));
        assert!(drain(&mut tl, 100).is_empty());
    }

    #[test]
    fn test_jobs_scheduled_mid_drain_are_timed_from_then() {
        let mut tl = Timeline::new();
        tl.after(100, Job::Start);
        let mut fired = Vec::new();
        while let Some((_, job)) = tl.pop_due(150) {
            if job == Job::Start {
                tl.every(20, Job::Advance);
            }
            fired.push((tl.now_ms(), job));
        }
        assert_eq!(
            fired,
            vec![(100, Job::Start), (120, Job::Advance), (140, Job::Advance)]
        );
    }
}
