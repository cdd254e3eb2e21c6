//! Level session
//!
//! The explicit context for one level: settings, the conveyor, the control
//! pad, the virtual-time scheduler and the renderer. The host calls
//! `update` with the wall-clock time since the last frame and forwards
//! player input; everything else is driven by jobs on the timeline.

use crate::error::ConveyorError;
use crate::level::LevelConfig;
use crate::render::Renderer;
use crate::settings::Settings;
use crate::sim::{
    Control, ControlPad, ConveyorEvent, Job, LevelSummary, RejectReason, Scheduler,
    SequenceConveyor, Submission, TimerHandle, Timeline,
};

/// Longest frame processed in one update; a stalled host doesn't replay minutes
pub const MAX_UPDATE_MS: u64 = 250;

#[derive(Debug)]
pub struct Session<R: Renderer> {
    level: LevelConfig,
    settings: Settings,
    conveyor: SequenceConveyor,
    controls: ControlPad,
    timeline: Timeline,
    renderer: R,
    frame_timer: Option<TimerHandle>,
    start_timer: Option<TimerHandle>,
}

impl<R: Renderer> Session<R> {
    pub fn new(
        level: LevelConfig,
        settings: Settings,
        renderer: R,
        seed: u64,
    ) -> Result<Self, ConveyorError> {
        let settings = settings.sanitized();
        let conveyor = SequenceConveyor::from_level(&level, &settings)?;
        let controls = ControlPad::new(
            &level.control_bases(&settings),
            level.rotate_enabled,
            seed,
        )?;

        let mut timeline = Timeline::new();
        let frame_timer = timeline.every(settings.animation.frame_ms, Job::Animate);
        let start_timer = timeline.after(settings.start_delay_ms, Job::Start);

        log::info!(
            "Level {:?} loaded: {} bases, speed {}, rotation {}",
            level.name,
            conveyor.remaining(),
            conveyor.speed(),
            level.rotate_enabled
        );

        let mut session = Self {
            level,
            settings,
            conveyor,
            controls,
            timeline,
            renderer,
            frame_timer: Some(frame_timer),
            start_timer: Some(start_timer),
        };
        session.conveyor.present(&mut session.renderer);
        Ok(session)
    }

    /// Run every job due within the next `elapsed_ms`, then present
    pub fn update(&mut self, elapsed_ms: u64) {
        let until = self.timeline.now_ms() + elapsed_ms.min(MAX_UPDATE_MS);
        while let Some((_, job)) = self.timeline.pop_due(until) {
            self.dispatch(job);
        }
        self.timeline.advance_to(until);
        self.conveyor.present(&mut self.renderer);
    }

    fn dispatch(&mut self, job: Job) {
        match job {
            Job::Start => {
                self.start_timer = None;
                self.conveyor.start(&mut self.timeline);
            }
            Job::Advance => self.conveyor.advance(),
            Job::Animate => self.conveyor.animate(self.settings.animation.frame_ms),
            Job::ScoreTick => self.conveyor.tick_score(),
        }
        if self.conveyor.is_complete() {
            self.conveyor.stop(&mut self.timeline);
        }
    }

    /// Skip the intro delay
    pub fn start_now(&mut self) {
        if let Some(handle) = self.start_timer.take() {
            self.timeline.cancel(handle);
        }
        self.conveyor.start(&mut self.timeline);
    }

    /// Tap on a control: quarter turn on rotation levels
    pub fn rotate_control(&mut self, index: usize) -> Option<f32> {
        self.controls.rotate(index)
    }

    /// Drop a control on the binding pocket
    ///
    /// Returns `None` for an unknown control index. The controls reshuffle
    /// only when the drop was judged against a head.
    pub fn drop_control(&mut self, index: usize) -> Option<Submission> {
        let Control { base, angle } = self.controls.get(index)?;
        let candidate = self.conveyor.candidate(base, angle);
        let result = self.conveyor.submit_match(candidate);
        if !matches!(
            result,
            Submission::Ignored | Submission::Rejected(RejectReason::NoHead)
        ) {
            self.controls.shuffle();
        }
        Some(result)
    }

    pub fn drain_events(&mut self) -> Vec<ConveyorEvent> {
        self.conveyor.drain_events()
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn conveyor(&self) -> &SequenceConveyor {
        &self.conveyor
    }

    pub fn controls(&self) -> &ControlPad {
        &self.controls
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    /// Level over and every exit animation finished
    pub fn is_done(&self) -> bool {
        self.conveyor.is_settled()
    }

    pub fn summary(&self) -> LevelSummary {
        self.conveyor.summary()
    }

    /// Stop every timer, release all drawables, hand back the renderer
    pub fn finish(mut self) -> (LevelSummary, R) {
        self.conveyor.stop(&mut self.timeline);
        if let Some(handle) = self.frame_timer.take() {
            self.timeline.cancel(handle);
        }
        if let Some(handle) = self.start_timer.take() {
            self.timeline.cancel(handle);
        }
        let summary = self.conveyor.summary();
        self.conveyor.teardown(&mut self.renderer);
        log::info!(
            "Level {:?} finished: score {}, accuracy {}%",
            self.level.name,
            summary.score,
            summary.accuracy
        );
        (summary, self.renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::sim::{ConveyorState, Submission};

    fn level(sequence: &str, speed: u32) -> LevelConfig {
        LevelConfig {
            name: "test".to_string(),
            sequence: sequence.to_string(),
            speed,
            ..LevelConfig::default()
        }
    }

    fn settings() -> Settings {
        Settings {
            quantization_factor: 4,
            start_delay_ms: 100,
            ..Settings::default()
        }
    }

    /// Drop the right control whenever the pocket is free
    fn autoplay(session: &mut Session<HeadlessRenderer>) -> bool {
        let Some(head) = session.conveyor().head_token() else {
            return false;
        };
        if session.conveyor().is_busy() {
            return false;
        }
        let Some(partner) = session.conveyor().valid_match_of(head) else {
            return false;
        };
        let index = session
            .controls()
            .controls()
            .iter()
            .position(|c| c.base == partner);
        match index {
            Some(i) => session.drop_control(i).is_some(),
            None => false,
        }
    }

    #[test]
    fn test_conveyor_waits_for_start_delay() {
        let mut session =
            Session::new(level("ATGC", 20), settings(), HeadlessRenderer::new(), 1).expect("session");
        for _ in 0..4 {
            session.update(20);
        }
        assert_eq!(session.conveyor().state(), ConveyorState::Idle);
        session.update(20);
        assert_eq!(session.now_ms(), 100);
        assert_eq!(session.conveyor().state(), ConveyorState::Running);
    }

    #[test]
    fn test_long_frames_are_capped() {
        let mut session =
            Session::new(level("AT", 20), settings(), HeadlessRenderer::new(), 1).expect("session");
        session.update(10_000);
        assert_eq!(session.now_ms(), MAX_UPDATE_MS);
    }

    #[test]
    fn test_perfect_play_matches_every_base() {
        let mut session =
            Session::new(level("ATGC", 200), settings(), HeadlessRenderer::new(), 7).expect("session");
        for _ in 0..2000 {
            if session.is_done() {
                break;
            }
            autoplay(&mut session);
            session.update(20);
        }
        assert!(session.is_done());

        let events = session.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ConveyorEvent::SequenceComplete))
                .count(),
            1
        );

        let (summary, renderer) = session.finish();
        assert_eq!(summary.output, "TACG");
        assert_eq!(summary.correct, 4);
        assert_eq!(summary.wrong, 0);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.score, 400);
        assert_eq!(summary.accuracy, 100);
        assert_eq!(summary.rate, 4);
        assert!(summary.complete);
        assert_eq!(renderer.live_count(), 0);
    }

    #[test]
    fn test_idle_player_misses_everything() {
        let mut session =
            Session::new(level("ATG", 20), settings(), HeadlessRenderer::new(), 3).expect("session");
        for _ in 0..500 {
            if session.is_done() {
                break;
            }
            session.update(20);
        }
        let summary = session.summary();
        assert!(summary.complete);
        assert_eq!(summary.missed, 3);
        assert_eq!(summary.accuracy, 0);
        assert_eq!(summary.output, "");
    }

    #[test]
    fn test_drop_shuffles_rotation_controls() {
        let mut rotating = level("ATGC", 20);
        rotating.rotate_enabled = true;
        let mut session =
            Session::new(rotating, settings(), HeadlessRenderer::new(), 11).expect("session");
        assert!(session.conveyor().check_orientation());
        assert_eq!(session.rotate_control(0).map(|a| a % 90.0), Some(0.0));

        let result = session.drop_control(0).expect("control exists");
        assert_ne!(result, Submission::Ignored);
        assert_eq!(session.drop_control(1), Some(Submission::Ignored));
        assert_eq!(session.drop_control(99), None);
    }

    #[test]
    fn test_drop_without_head_keeps_controls() {
        let mut rotating = level("A", 20);
        rotating.rotate_enabled = true;
        let mut session =
            Session::new(rotating, settings(), HeadlessRenderer::new(), 5).expect("session");
        session.start_now();
        // The only base rolls off on the first advance
        session.update(20);
        assert!(session.conveyor().is_complete());
        assert!(!session.conveyor().is_running());

        let before = session.controls().controls().to_vec();
        assert_eq!(
            session.drop_control(0),
            Some(Submission::Rejected(RejectReason::NoHead))
        );
        assert_eq!(session.controls().controls(), before.as_slice());
    }

    #[test]
    fn test_bad_level_is_an_error() {
        let bad = level("AXT", 20);
        assert!(matches!(
            Session::new(bad, settings(), HeadlessRenderer::new(), 1),
            Err(ConveyorError::InvalidSymbol { symbol: 'X', index: 1 })
        ));
    }
}
