//! Sequencing conveyor
//!
//! The central state machine. Three slot queues move in lockstep:
//! - strand: template tokens, index 0 is the slot about to roll off
//! - complement: the matching preview, led by a run of empty slots
//! - output: accepted candidates, newest at the back
//!
//! Only every `quantization_factor`-th strand/complement slot ever holds a
//! token; the empty slots in between make each advance a small visual step.
//!
//! Tokens leaving a queue (rolled off, rejected, consumed) are parked in
//! flight until their animation finishes and the cue attached to it runs.
//! The candidate of a submission is in flight from the drop until it binds
//! or is discarded, so `advance` never touches it.

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::lanes::{LaneLayout, Placement};
use super::pairing::{self, MatchValidator, Verdict};
use super::schedule::{Job, Scheduler, TimerHandle};
use super::score::ScoreTracker;
use super::token::{Base, Cue, DisplayMode, GlyphStyle, Token, TokenId};
use crate::consts::*;
use crate::error::ConveyorError;
use crate::level::LevelConfig;
use crate::render::{DrawableHandle, Renderer};
use crate::settings::{AnimationTuning, Settings};

/// Lifecycle of a conveyor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConveyorState {
    /// Built, advance tick not running
    Idle,
    Running,
    /// A candidate is in flight; further submissions are ignored
    Submitting,
    /// Strand exhausted (terminal)
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Nothing in the strand to match against
    NoHead,
    /// Wrong base; `expected` is the partner the head wanted
    Mismatch { expected: Option<Base> },
    /// Right base, but rotated a quarter turn
    Misoriented,
}

/// Result of `submit_match`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submission {
    Accepted,
    Rejected(RejectReason),
    /// Another submission is still resolving
    Ignored,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted)
    }
}

/// Outward signals for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConveyorEvent {
    HeadChanged {
        head: Option<TokenId>,
        base: Option<Base>,
    },
    /// Binding pocket highlight on/off
    PocketChanged { active: bool },
    /// Candidate bound into the output
    Accepted {
        candidate: TokenId,
        base: Base,
        head: Base,
    },
    /// Candidate refused (presentation shakes and flashes)
    Rejected {
        candidate: TokenId,
        base: Base,
        head: Base,
        reason: RejectReason,
    },
    /// Template base rolled off unmatched
    Missed { token: TokenId, base: Base },
    SequenceComplete,
}

/// End-of-level readout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub template: String,
    /// Bound bases, oldest first
    pub output: String,
    pub score: u64,
    pub accuracy: u32,
    pub rate: u32,
    pub correct: u32,
    pub wrong: u32,
    pub missed: u32,
    pub elapsed_ticks: u64,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    candidate: TokenId,
    /// Head an accepted candidate consumes once bound
    head: Option<(TokenId, Base)>,
}

#[derive(Debug)]
pub struct SequenceConveyor {
    settings: Settings,
    lanes: LaneLayout,
    validator: MatchValidator,
    glyph: GlyphStyle,
    speed: u32,
    template: Vec<Base>,

    strand: VecDeque<Option<Token>>,
    complement: VecDeque<Option<Token>>,
    output: VecDeque<Option<Token>>,
    in_flight: Vec<Token>,

    pending: Option<Pending>,
    running: bool,
    complete: bool,
    advance_timer: Option<TimerHandle>,
    score_timer: Option<TimerHandle>,

    head: Option<TokenId>,
    pocket_active: bool,
    next_id: u32,
    /// Heads that drew a wrong attempt; a later roll-off costs nothing extra
    wrong_heads: HashSet<TokenId>,

    score: ScoreTracker,
    events: Vec<ConveyorEvent>,
    /// Drawables of dropped tokens, destroyed on the next presentation pass
    released: Vec<DrawableHandle>,
}

impl SequenceConveyor {
    /// Plain conveyor: basic glyphs, no orientation check
    pub fn new(bases: &[Base], speed: u32, settings: &Settings) -> Self {
        Self::with_options(bases, speed, false, GlyphStyle::Basic, settings)
    }

    pub fn from_level(level: &LevelConfig, settings: &Settings) -> Result<Self, ConveyorError> {
        let bases = level.bases()?;
        Ok(Self::with_options(
            &bases,
            level.speed_or(settings.default_speed),
            level.rotate_enabled,
            level.glyph,
            settings,
        ))
    }

    pub fn with_options(
        bases: &[Base],
        speed: u32,
        check_orientation: bool,
        glyph: GlyphStyle,
        settings: &Settings,
    ) -> Self {
        let settings = settings.clone().sanitized();
        let q = settings.quantization_factor;
        let lead = settings.complement_lead_windows * q;
        let speed = speed.max(1);

        let mut next_id = 0;
        let mut strand = VecDeque::with_capacity(bases.len() * q);
        let mut complement = VecDeque::with_capacity(lead + bases.len() * q);
        complement.extend((0..lead).map(|_| None));

        for &base in bases {
            let token = Token::new(TokenId(next_id), base, glyph);
            next_id += 1;
            // Complement derived once from the strand token's pairing set
            let partner = token.pairing_set().first().map(|partner| {
                let t = Token::new(TokenId(next_id), partner, GlyphStyle::Basic);
                next_id += 1;
                t
            });
            strand.push_back(Some(token));
            strand.extend((1..q).map(|_| None));
            complement.push_back(partner);
            complement.extend((1..q).map(|_| None));
        }

        let mut conveyor = Self {
            lanes: LaneLayout::build(&settings),
            validator: MatchValidator::new(check_orientation),
            glyph,
            speed,
            template: bases.to_vec(),
            output: VecDeque::with_capacity(strand.len()),
            strand,
            complement,
            in_flight: Vec::new(),
            pending: None,
            running: false,
            complete: false,
            advance_timer: None,
            score_timer: None,
            head: None,
            pocket_active: false,
            next_id,
            wrong_heads: HashSet::new(),
            score: ScoreTracker::new(
                bases.len(),
                speed,
                settings.points_per_match,
                settings.attrition,
            ),
            events: Vec::new(),
            released: Vec::new(),
            settings,
        };

        conveyor.layout(false);
        conveyor.refresh_head();
        conveyor.check_complete();
        log::debug!(
            "Conveyor built: {} bases, {} strand slots, speed {}",
            bases.len(),
            conveyor.strand.len(),
            speed
        );
        conveyor
    }

    // === Tick loop ===

    /// Begin the advance tick and the score clock
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        if self.running || self.complete {
            log::debug!("Conveyor start ignored ({:?})", self.state());
            return;
        }
        self.advance_timer = Some(scheduler.every(self.speed, Job::Advance));
        self.score_timer = Some(scheduler.every(self.settings.score_tick_ms, Job::ScoreTick));
        self.running = true;
        log::info!(
            "Conveyor started: {} bases, advance every {} ms",
            self.template.len(),
            self.speed
        );
    }

    /// Cancel the tick; queues and in-flight animations are left alone
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.advance_timer.take() {
            scheduler.cancel(handle);
        }
        if let Some(handle) = self.score_timer.take() {
            scheduler.cancel(handle);
        }
        if self.running {
            self.running = false;
            log::info!("Conveyor stopped after {} ticks", self.score.elapsed_ticks());
        }
    }

    pub fn tick_score(&mut self) {
        if self.running && !self.complete {
            self.score.tick();
        }
    }

    /// Shift every queue one slot toward the pocket
    ///
    /// Order within one advance: roll-off eviction, shift, retarget.
    pub fn advance(&mut self) {
        if self.complete {
            return;
        }

        let active = self.head.is_some();
        if active != self.pocket_active {
            self.pocket_active = active;
            self.events.push(ConveyorEvent::PocketChanged { active });
        }

        if let Some(token) = self.strand.front_mut().and_then(Option::take) {
            self.roll_off(token);
        }

        self.strand.pop_front();
        if let Some(Some(mut token)) = self.complement.pop_front() {
            self.release(&mut token);
        }
        self.output.push_back(None);
        self.trim_output();

        self.layout(true);
        self.refresh_head();
        self.check_complete();
    }

    /// Step every tween by one animation frame and run finished cues
    pub fn animate(&mut self, dt_ms: u32) {
        for token in self
            .strand
            .iter_mut()
            .chain(self.complement.iter_mut())
            .chain(self.output.iter_mut())
            .flatten()
        {
            token.animate(dt_ms);
        }

        let cues: Vec<(TokenId, Cue)> = self
            .in_flight
            .iter_mut()
            .filter_map(|t| t.animate(dt_ms).map(|cue| (t.id(), cue)))
            .collect();
        for (id, cue) in cues {
            self.resolve(id, cue);
        }
    }

    // === Submissions ===

    /// A fresh candidate token as dropped from the control pad
    pub fn candidate(&mut self, base: Base, angle: f32) -> Token {
        let mut token = Token::new(self.alloc_id(), base, self.glyph);
        token.set_display(DisplayMode::Expanded);
        token.set_angle(angle);
        token.show_letter(true);
        token
    }

    /// Judge `candidate` against the head and start its animation
    pub fn submit_match(&mut self, mut candidate: Token) -> Submission {
        if self.pending.is_some() {
            log::debug!("Submission of {} ignored, one in flight", candidate.base());
            return Submission::Ignored;
        }
        let head = if self.complete { None } else { self.head_token() };
        let Some(head) = head else {
            log::debug!("Submission of {} with no head", candidate.base());
            return Submission::Rejected(RejectReason::NoHead);
        };
        let (head_id, head_base) = (head.id(), head.base());
        let verdict = self.validator.validate(head, &candidate);
        let expected = pairing::valid_match_of(head);

        self.score.record_outcome(verdict.is_match());
        if !verdict.is_match() {
            self.wrong_heads.insert(head_id);
        }
        log::debug!(
            "Candidate {} on head {} (angle {}): {:?}",
            candidate.base(),
            head_base,
            candidate.angle(),
            verdict
        );

        let (result, cue) = match verdict {
            Verdict::Match => (Submission::Accepted, Cue::Bind),
            Verdict::Mismatch => (
                Submission::Rejected(RejectReason::Mismatch { expected }),
                Cue::Return,
            ),
            Verdict::Misoriented => (Submission::Rejected(RejectReason::Misoriented), Cue::Return),
        };

        let tuning = self.settings.animation;
        candidate.set_display(DisplayMode::Expanded);
        candidate.set_scale(self.settings.candidate_scale);
        candidate.set_visible(true);
        candidate.glide_from(
            self.lanes.candidate_start(),
            self.lanes.candidate_hold(),
            &tuning,
            Some(cue),
        );

        self.pending = Some(Pending {
            candidate: candidate.id(),
            head: verdict.is_match().then_some((head_id, head_base)),
        });
        if let Submission::Rejected(reason) = result {
            candidate.set_error(true);
            self.events.push(ConveyorEvent::Rejected {
                candidate: candidate.id(),
                base: candidate.base(),
                head: head_base,
                reason,
            });
        }
        self.in_flight.push(candidate);
        result
    }

    // === Queries ===

    /// First token in the strand, scanning from the pocket end
    pub fn head_token(&self) -> Option<&Token> {
        self.strand.iter().flatten().next()
    }

    pub fn head_index(&self) -> Option<usize> {
        self.strand.iter().position(Option::is_some)
    }

    /// Base to suggest when `head` was mismatched
    pub fn valid_match_of(&self, head: &Token) -> Option<Base> {
        pairing::valid_match_of(head)
    }

    pub fn strand_slots(&self) -> impl Iterator<Item = Option<&Token>> + '_ {
        self.strand.iter().map(Option::as_ref)
    }

    pub fn complement_slots(&self) -> impl Iterator<Item = Option<&Token>> + '_ {
        self.complement.iter().map(Option::as_ref)
    }

    /// Output slots, oldest first
    pub fn output_slots(&self) -> impl Iterator<Item = Option<&Token>> + '_ {
        self.output.iter().map(Option::as_ref)
    }

    /// Tokens bound into the output
    pub fn output_len(&self) -> usize {
        self.output.iter().flatten().count()
    }

    /// Template tokens still on the strand
    pub fn remaining(&self) -> usize {
        self.strand.iter().flatten().count()
    }

    /// Tokens animating outside the queues
    pub fn in_flight(&self) -> &[Token] {
        &self.in_flight
    }

    pub fn state(&self) -> ConveyorState {
        if self.complete {
            ConveyorState::Complete
        } else if self.pending.is_some() {
            ConveyorState::Submitting
        } else if self.running {
            ConveyorState::Running
        } else {
            ConveyorState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Complete and nothing left animating out
    pub fn is_settled(&self) -> bool {
        self.complete && self.in_flight.is_empty()
    }

    pub fn pocket_active(&self) -> bool {
        self.pocket_active
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn check_orientation(&self) -> bool {
        self.validator.check_orientation
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn drain_events(&mut self) -> Vec<ConveyorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn summary(&self) -> LevelSummary {
        LevelSummary {
            template: self.template.iter().map(|b| b.as_char()).collect(),
            output: self
                .output
                .iter()
                .flatten()
                .map(|t| t.base().as_char())
                .collect(),
            score: self.score.score(),
            accuracy: self.score.accuracy(),
            rate: self.score.rate(),
            correct: self.score.correct(),
            wrong: self.score.wrong(),
            missed: self.score.missed(),
            elapsed_ticks: self.score.elapsed_ticks(),
            complete: self.complete,
        }
    }

    // === Presentation ===

    /// Destroy released drawables and push changed token state
    pub fn present(&mut self, renderer: &mut dyn Renderer) {
        for handle in self.released.drain(..) {
            renderer.destroy(handle);
        }
        for token in self
            .strand
            .iter_mut()
            .chain(self.complement.iter_mut())
            .chain(self.output.iter_mut())
            .flatten()
            .chain(self.in_flight.iter_mut())
        {
            token.sync(renderer);
        }
    }

    /// Release every drawable and empty the queues
    pub fn teardown(&mut self, renderer: &mut dyn Renderer) {
        for token in self
            .strand
            .iter_mut()
            .chain(self.complement.iter_mut())
            .chain(self.output.iter_mut())
            .flatten()
            .chain(self.in_flight.iter_mut())
        {
            if let Some(handle) = token.take_drawable() {
                self.released.push(handle);
            }
        }
        let released = self.released.len();
        for handle in self.released.drain(..) {
            renderer.destroy(handle);
        }
        self.strand.clear();
        self.complement.clear();
        self.output.clear();
        self.in_flight.clear();
        self.pending = None;
        log::debug!("Conveyor torn down, {} drawables released", released);
    }

    // === Internals ===

    fn alloc_id(&mut self) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        id
    }

    fn release(&mut self, token: &mut Token) {
        if let Some(handle) = token.take_drawable() {
            self.released.push(handle);
        }
    }

    /// The front slot held a token when the conveyor advanced
    fn roll_off(&mut self, mut token: Token) {
        let consumed = self
            .pending
            .and_then(|p| p.head)
            .is_some_and(|(id, _)| id == token.id());
        let had_wrong = self.wrong_heads.remove(&token.id());
        if !consumed {
            self.score.record_miss(had_wrong);
            token.set_missing(true);
            self.events.push(ConveyorEvent::Missed {
                token: token.id(),
                base: token.base(),
            });
            log::debug!("Base {} rolled off unmatched", token.base());
        }
        self.evict(token);
    }

    /// Slide and fade a token out of the strand, then drop it
    fn evict(&mut self, mut token: Token) {
        let tuning = self.settings.animation;
        let target = token.position() + self.settings.evict_offset;
        token.glide_to(target, &tuning, None);
        token.fade_out(&tuning, Some(Cue::Discard));
        self.in_flight.push(token);
    }

    fn resolve(&mut self, id: TokenId, cue: Cue) {
        let Some(idx) = self.in_flight.iter().position(|t| t.id() == id) else {
            return;
        };
        match cue {
            Cue::Bind => {
                let token = self.in_flight.swap_remove(idx);
                self.bind(token);
            }
            Cue::Return => {
                let tuning = self.settings.animation;
                let home = self.lanes.candidate_start();
                let token = &mut self.in_flight[idx];
                token.fade_out(&tuning, None);
                token.glide_to(home, &tuning, Some(Cue::Discard));
            }
            Cue::Discard => {
                let mut token = self.in_flight.swap_remove(idx);
                self.release(&mut token);
                if self.pending.is_some_and(|p| p.candidate == id) {
                    self.pending = None;
                    log::debug!("Rejected candidate {} discarded", token.base());
                    self.check_complete();
                }
            }
        }
    }

    /// Accepted candidate reached the hold point
    fn bind(&mut self, mut token: Token) {
        let Some(Pending {
            head: Some((head_id, head_base)),
            ..
        }) = self.pending.take()
        else {
            log::warn!("Bind cue for {:?} without an accepted submission", token.id());
            self.release(&mut token);
            return;
        };

        let tuning = self.settings.animation;
        token.glide_to(self.lanes.candidate_settle(), &tuning, None);
        self.events.push(ConveyorEvent::Accepted {
            candidate: token.id(),
            base: token.base(),
            head: head_base,
        });
        log::debug!("Bound {} to {}", token.base(), head_base);

        let q = self.settings.quantization_factor;
        self.output.push_back(Some(token));
        self.output.extend((0..2 * q).map(|_| None));
        self.trim_output();

        // The head may already have rolled off while the candidate flew
        let index = self
            .strand
            .iter()
            .position(|s| s.as_ref().is_some_and(|t| t.id() == head_id));
        let head = index
            .and_then(|i| self.strand.get_mut(i))
            .and_then(Option::take);
        if let Some(head) = head {
            self.evict(head);
        }
        self.wrong_heads.remove(&head_id);

        self.refresh_head();
        self.check_complete();
    }

    /// Drop the oldest empty output slots once they are past the lane
    fn trim_output(&mut self) {
        let capacity = self.lanes.output_capacity();
        while self.output.len() > capacity && matches!(self.output.front(), Some(None)) {
            self.output.pop_front();
        }
    }

    fn refresh_head(&mut self) {
        let head = self.head_token().map(|t| (t.id(), t.base()));
        let id = head.map(|(id, _)| id);
        if id != self.head {
            self.head = id;
            self.events.push(ConveyorEvent::HeadChanged {
                head: id,
                base: head.map(|(_, base)| base),
            });
        }
    }

    fn check_complete(&mut self) {
        if self.complete || self.pending.is_some() || self.remaining() > 0 {
            return;
        }
        self.complete = true;
        // Timers stay registered until `stop`; their jobs are no-ops from here
        self.running = false;
        if self.pocket_active {
            self.pocket_active = false;
            self.events.push(ConveyorEvent::PocketChanged { active: false });
        }
        self.events.push(ConveyorEvent::SequenceComplete);
        log::info!(
            "Sequence complete: score {}, accuracy {}%",
            self.score.score(),
            self.score.accuracy()
        );
    }

    /// Retarget every queued token to its slot
    fn layout(&mut self, animate: bool) {
        let tuning = self.settings.animation;
        let lanes = &self.lanes;

        for (i, slot) in self.strand.iter_mut().enumerate() {
            if let Some(token) = slot {
                place(token, lanes.strand_slot(i), STRAND_ROW_START, animate, &tuning);
            }
        }
        for (i, slot) in self.complement.iter_mut().enumerate() {
            if let Some(token) = slot {
                place(token, lanes.complement_slot(i), COMPLEMENT_ROW_START, animate, &tuning);
            }
        }
        let newest = self.output.len().saturating_sub(1);
        for (j, slot) in self.output.iter_mut().enumerate() {
            if let Some(token) = slot {
                place(token, lanes.output_slot(newest - j), OUTPUT_ROW_END, animate, &tuning);
            }
        }
    }
}

/// Move a queued token to its placement, or park it hidden off the lane
fn place(
    token: &mut Token,
    placement: Option<Placement>,
    parked: Vec2,
    animate: bool,
    tuning: &AnimationTuning,
) {
    let Some(p) = placement else {
        token.set_visible(false);
        token.set_position(parked);
        return;
    };

    let was_visible = token.is_visible();
    let reshaped = token.display() != p.display;
    token.set_display(p.display);
    token.set_visible(true);

    if animate && !reshaped {
        if token.scale() != p.scale {
            token.scale_to(p.scale, tuning);
        }
    } else {
        token.set_scale(p.scale);
    }

    if animate && was_visible {
        token.glide_to(p.position, tuning, None);
    } else {
        token.set_position(p.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::settings::AttritionPolicy;
    use crate::sim::schedule::Timeline;
    use proptest::prelude::*;

    fn settings(q: usize) -> Settings {
        Settings {
            quantization_factor: q,
            ..Settings::default()
        }
    }

    fn bases(s: &str) -> Vec<Base> {
        Base::parse_sequence(s).expect("valid sequence")
    }

    fn conveyor(s: &str, q: usize) -> SequenceConveyor {
        SequenceConveyor::new(&bases(s), 20, &settings(q))
    }

    /// Run animation frames until the current submission resolves
    fn settle(c: &mut SequenceConveyor) {
        for _ in 0..500 {
            if !c.is_busy() {
                return;
            }
            c.animate(20);
        }
        panic!("submission never resolved");
    }

    fn count_complete(events: &[ConveyorEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ConveyorEvent::SequenceComplete))
            .count()
    }

    #[test]
    fn test_accepted_match_binds_into_output() {
        let mut c = conveyor("AT", 4);
        assert_eq!(c.score().rate(), 2);
        assert_eq!(c.head_token().map(|t| t.base()), Some(Base::A));

        let candidate = c.candidate(Base::T, 0.0);
        assert_eq!(c.submit_match(candidate), Submission::Accepted);
        assert_eq!(c.state(), ConveyorState::Submitting);
        // Not bound until the candidate reaches the hold point
        assert_eq!(c.output_len(), 0);

        settle(&mut c);
        assert_eq!(c.output_len(), 1);
        assert_eq!(c.score().wrong(), 0);
        assert_eq!(c.score().score(), 100);
        assert_eq!(c.head_token().map(|t| t.base()), Some(Base::T));
        assert_eq!(c.state(), ConveyorState::Idle);

        let events = c.drain_events();
        assert!(events.contains(&ConveyorEvent::Accepted {
            candidate: TokenId(4),
            base: Base::T,
            head: Base::A,
        }));
    }

    #[test]
    fn test_wrong_base_is_rejected_without_consuming_head() {
        let mut c = conveyor("AT", 4);
        let candidate = c.candidate(Base::A, 0.0);
        assert_eq!(
            c.submit_match(candidate),
            Submission::Rejected(RejectReason::Mismatch {
                expected: Some(Base::T)
            })
        );
        assert_eq!(c.score().wrong(), 1);

        settle(&mut c);
        assert_eq!(c.output_len(), 0);
        assert_eq!(c.score().wrong(), 1);
        assert_eq!(c.score().score(), 0);
        assert_eq!(c.head_token().map(|t| t.base()), Some(Base::A));
        assert!(c.in_flight().is_empty());
        assert!(
            c.drain_events()
                .iter()
                .any(|e| matches!(e, ConveyorEvent::Rejected { head: Base::A, .. }))
        );
    }

    #[test]
    fn test_quarter_turn_rejected_on_rotation_levels() {
        let mut c = SequenceConveyor::with_options(
            &bases("A"),
            20,
            true,
            GlyphStyle::Basic,
            &settings(4),
        );
        let rotated = c.candidate(Base::T, 90.0);
        assert_eq!(
            c.submit_match(rotated),
            Submission::Rejected(RejectReason::Misoriented)
        );
        settle(&mut c);

        let flipped = c.candidate(Base::T, 180.0);
        assert_eq!(c.submit_match(flipped), Submission::Accepted);
        settle(&mut c);
        assert_eq!(c.score().correct(), 1);
        assert_eq!(c.score().wrong(), 1);
    }

    #[test]
    fn test_second_submission_while_busy_is_ignored() {
        let mut c = conveyor("AT", 4);
        let first = c.candidate(Base::T, 0.0);
        let second = c.candidate(Base::T, 0.0);
        assert_eq!(c.submit_match(first), Submission::Accepted);
        assert_eq!(c.submit_match(second), Submission::Ignored);
        assert_eq!(c.score().attempts(), 1);
    }

    #[test]
    fn test_no_head_is_a_rejected_no_op() {
        let mut c = conveyor("", 4);
        assert!(c.is_complete());
        let candidate = c.candidate(Base::T, 0.0);
        assert_eq!(
            c.submit_match(candidate),
            Submission::Rejected(RejectReason::NoHead)
        );
        assert_eq!(c.score().attempts(), 0);
        assert!(c.in_flight().is_empty());
    }

    #[test]
    fn test_sequence_complete_fires_once() {
        let mut c = conveyor("A", 2);
        let mut events = c.drain_events();
        assert_eq!(count_complete(&events), 0);

        // Head sits at slot 0, the first advance rolls it off
        c.advance();
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.state(), ConveyorState::Complete);
        for _ in 0..10 {
            c.advance();
            c.animate(20);
        }
        events.extend(c.drain_events());
        assert_eq!(count_complete(&events), 1);
        assert_eq!(c.score().missed(), 1);
        assert_eq!(c.score().accuracy(), 0);
    }

    #[test]
    fn test_completion_ends_the_tick() {
        let mut tl = Timeline::new();
        let mut c = conveyor("A", 2);
        c.start(&mut tl);
        while let Some((_, job)) = tl.pop_due(10_000) {
            match job {
                Job::Advance => c.advance(),
                Job::ScoreTick => c.tick_score(),
                _ => {}
            }
        }
        assert_eq!(c.state(), ConveyorState::Complete);
        assert!(!c.is_running());
        // Strand ran out on the first advance, before any score tick
        assert_eq!(c.score().elapsed_ticks(), 0);

        c.stop(&mut tl);
        assert!(tl.is_empty());
    }

    #[test]
    fn test_head_changed_follows_bind_and_roll_off() {
        fn heads(events: Vec<ConveyorEvent>) -> Vec<(Option<TokenId>, Option<Base>)> {
            events
                .into_iter()
                .filter_map(|e| match e {
                    ConveyorEvent::HeadChanged { head, base } => Some((head, base)),
                    _ => None,
                })
                .collect()
        }

        // Strand tokens get ids 0, 2, 4; their complements 1, 3, 5
        let mut c = conveyor("ATG", 2);
        assert_eq!(heads(c.drain_events()), vec![(Some(TokenId(0)), Some(Base::A))]);

        let candidate = c.candidate(Base::T, 0.0);
        assert_eq!(c.submit_match(candidate), Submission::Accepted);
        settle(&mut c);
        assert_eq!(heads(c.drain_events()), vec![(Some(TokenId(2)), Some(Base::T))]);

        // T walks from slot 2 down to the pocket
        c.advance();
        c.advance();
        assert_eq!(c.head_index(), Some(0));
        assert!(heads(c.drain_events()).is_empty());

        c.advance();
        assert_eq!(heads(c.drain_events()), vec![(Some(TokenId(4)), Some(Base::G))]);
        c.advance();
        assert!(heads(c.drain_events()).is_empty());

        c.advance();
        assert_eq!(heads(c.drain_events()), vec![(None, None)]);
        assert!(c.is_complete());
    }

    #[test]
    fn test_wrong_base_then_roll_off_charges_once() {
        let mut c = conveyor("AT", 1);
        let candidate = c.candidate(Base::A, 0.0);
        assert!(matches!(
            c.submit_match(candidate),
            Submission::Rejected(RejectReason::Mismatch { .. })
        ));
        settle(&mut c);

        c.advance();
        assert_eq!(c.score().wrong(), 1);
        assert_eq!(c.score().missed(), 1);
        assert_eq!(c.score().accuracy(), 50);
        assert!(
            c.drain_events()
                .iter()
                .any(|e| matches!(e, ConveyorEvent::Missed { base: Base::A, .. }))
        );

        // T had no attempt, so its miss is charged
        c.advance();
        assert_eq!(c.score().missed(), 2);
        assert_eq!(c.score().accuracy(), 0);
    }

    #[test]
    fn test_consumed_head_rolling_off_is_not_a_miss() {
        let mut c = conveyor("AT", 1);
        let candidate = c.candidate(Base::T, 0.0);
        assert_eq!(c.submit_match(candidate), Submission::Accepted);
        // Head A leaves the strand while the candidate is still flying
        c.advance();
        assert_eq!(c.score().missed(), 0);
        settle(&mut c);
        assert_eq!(c.output_len(), 1);
        assert_eq!(c.head_token().map(|t| t.base()), Some(Base::T));
        assert!(!c.drain_events().iter().any(|e| matches!(e, ConveyorEvent::Missed { .. })));
    }

    #[test]
    fn test_attrition_policy() {
        let charged = {
            let mut c = conveyor("AA", 1);
            c.advance();
            c.advance();
            c
        };
        assert_eq!(charged.score().missed(), 2);
        assert_eq!(charged.score().accuracy(), 0);
        assert!(charged.is_complete());

        let free_settings = Settings {
            attrition: AttritionPolicy::Ignore,
            ..settings(1)
        };
        let mut free = SequenceConveyor::new(&bases("AA"), 20, &free_settings);
        free.advance();
        free.advance();
        assert_eq!(free.score().missed(), 2);
        assert_eq!(free.score().accuracy(), 100);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut tl = Timeline::new();
        let mut c = conveyor("ATGC", 4);
        c.start(&mut tl);
        assert_eq!(c.state(), ConveyorState::Running);
        assert_eq!(tl.len(), 2);

        c.stop(&mut tl);
        let after_first = (c.state(), tl.len(), c.remaining(), c.head_index());
        c.stop(&mut tl);
        assert_eq!(after_first, (c.state(), tl.len(), c.remaining(), c.head_index()));
        assert_eq!(after_first.0, ConveyorState::Idle);
        assert!(tl.is_empty());
    }

    #[test]
    fn test_start_schedules_advance_at_speed() {
        let mut tl = Timeline::new();
        let mut c = SequenceConveyor::new(&bases("ATGC"), 50, &settings(4));
        c.start(&mut tl);
        c.start(&mut tl);
        assert_eq!(tl.len(), 2, "second start is a no-op");

        let mut advances = 0;
        while let Some((_, job)) = tl.pop_due(200) {
            if job == Job::Advance {
                advances += 1;
            }
        }
        assert_eq!(advances, 4);
    }

    #[test]
    fn test_pocket_affordance_follows_head() {
        let mut c = conveyor("A", 4);
        assert!(!c.pocket_active());
        c.advance();
        // Rolled off, the strand is empty and complete
        let events = c.drain_events();
        assert!(events.contains(&ConveyorEvent::PocketChanged { active: true }));
        assert!(events.contains(&ConveyorEvent::PocketChanged { active: false }));
        assert!(!c.pocket_active());
    }

    #[test]
    fn test_tokens_enter_compact_and_merge_expanded() {
        let c = conveyor("ATGC", 4);
        let head = c.head_token().expect("head");
        assert_eq!(head.display(), DisplayMode::Expanded);
        assert!(head.is_visible());
        for t in c.complement_slots().flatten() {
            assert_eq!(t.display(), DisplayMode::Compact);
        }
    }

    #[test]
    fn test_present_and_teardown_release_every_drawable() {
        let mut renderer = HeadlessRenderer::new();
        let mut c = conveyor("ATGCAT", 2);
        c.present(&mut renderer);
        assert!(renderer.live_count() > 0);

        for _ in 0..40 {
            if let Some(head) = c.head_token() {
                let partner = c.valid_match_of(head).expect("partner");
                let candidate = c.candidate(partner, 0.0);
                c.submit_match(candidate);
            }
            c.animate(20);
            c.advance();
            c.present(&mut renderer);
        }
        for _ in 0..100 {
            c.animate(20);
        }
        c.present(&mut renderer);
        assert!(c.is_settled());

        c.teardown(&mut renderer);
        assert_eq!(renderer.live_count(), 0);
        assert_eq!(renderer.created_count(), renderer.destroyed_count());
    }

    proptest! {
        #[test]
        fn prop_strand_holds_sequence_on_window_starts(
            s in "[ATCG]{0,24}",
            q in 1_usize..6,
        ) {
            let c = conveyor(&s, q);
            let slots: Vec<Option<Base>> = c.strand_slots().map(|t| t.map(|t| t.base())).collect();
            let expected = bases(&s);
            prop_assert_eq!(slots.len(), expected.len() * q);
            prop_assert_eq!(slots.iter().flatten().count(), expected.len());
            for (i, slot) in slots.iter().enumerate() {
                if i % q == 0 {
                    prop_assert_eq!(*slot, Some(expected[i / q]));
                } else {
                    prop_assert_eq!(*slot, None);
                }
            }
        }

        #[test]
        fn prop_complement_pairs_with_strand(
            s in "[ATCG]{1,24}",
            q in 1_usize..6,
        ) {
            let c = conveyor(&s, q);
            let lead = Settings::default().complement_lead_windows * q;
            let strand: Vec<&Token> = c.strand_slots().flatten().collect();
            let complement: Vec<Option<&Token>> = c.complement_slots().collect();
            prop_assert!(complement[..lead].iter().all(Option::is_none));
            for (k, template) in strand.iter().enumerate() {
                let partner = complement[lead + k * q].expect("complement token");
                prop_assert!(template.pairing_set().contains(partner.base()));
            }
        }

        #[test]
        fn prop_head_is_lowest_filled_slot(
            s in "[ATCG]{1,12}",
            q in 1_usize..5,
            advances in 0_usize..60,
        ) {
            let mut c = conveyor(&s, q);
            for _ in 0..advances {
                c.advance();
            }
            let first = c.strand_slots().position(|t| t.is_some());
            prop_assert_eq!(c.head_index(), first);
            prop_assert_eq!(
                c.head_token().map(|t| t.id()),
                first.and_then(|i| c.strand_slots().nth(i).flatten().map(|t| t.id()))
            );
        }
    }
}
