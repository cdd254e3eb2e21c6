//! Base pairing rules and match validation
//!
//! Pairing is symmetric in biology (A-T, C-G) but every check here is made
//! from the head token's side, using the pairing set it was built with.

use serde::{Deserialize, Serialize};

use super::token::{Base, Token};

const PAIR_A: u8 = 1;
const PAIR_C: u8 = 2;
const PAIR_G: u8 = 4;
const PAIR_T: u8 = 8;

/// Bitmask of bases a token accepts as partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PairingSet(u8);

impl PairingSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    fn bit(base: Base) -> u8 {
        match base {
            Base::A => PAIR_A,
            Base::C => PAIR_C,
            Base::G => PAIR_G,
            Base::T => PAIR_T,
        }
    }

    /// Watson-Crick partner set for a base
    pub fn for_base(base: Base) -> Self {
        match base {
            Base::A => Self(PAIR_T),
            Base::T => Self(PAIR_A),
            Base::C => Self(PAIR_G),
            Base::G => Self(PAIR_C),
        }
    }

    #[inline]
    pub fn contains(self, base: Base) -> bool {
        self.0 & Self::bit(base) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in A, T, C, G order
    pub fn iter(self) -> impl Iterator<Item = Base> {
        Base::ALL.into_iter().filter(move |b| self.contains(*b))
    }

    /// The partner shown in corrective feedback
    pub fn first(self) -> Option<Base> {
        self.iter().next()
    }
}

/// `b` is a valid partner for `a`, judged from `a`'s pairing set
pub fn is_valid_pair(a: &Token, b: &Token) -> bool {
    a.pairing_set().contains(b.base())
}

/// Only upright and upside-down drops count (0 or 180 of the four quarter turns)
pub fn is_valid_orientation(candidate: &Token) -> bool {
    candidate.angle().rem_euclid(180.0) == 0.0
}

/// The base the player should have dropped on `head`
pub fn valid_match_of(head: &Token) -> Option<Base> {
    head.pairing_set().first()
}

/// Result of judging one candidate against the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Match,
    /// Wrong base (takes precedence over a bad orientation)
    Mismatch,
    /// Right base, wrong rotation
    Misoriented,
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// Judges candidates against the head for one level
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchValidator {
    /// Rotation levels also demand a valid orientation
    pub check_orientation: bool,
}

impl MatchValidator {
    pub fn new(check_orientation: bool) -> Self {
        Self { check_orientation }
    }

    pub fn validate(&self, head: &Token, candidate: &Token) -> Verdict {
        if !is_valid_pair(head, candidate) {
            Verdict::Mismatch
        } else if self.check_orientation && !is_valid_orientation(candidate) {
            Verdict::Misoriented
        } else {
            Verdict::Match
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::token::{GlyphStyle, TokenId};

    fn token(base: Base, angle: f32) -> Token {
        let mut t = Token::new(TokenId(1), base, GlyphStyle::Basic);
        t.set_angle(angle);
        t
    }

    #[test]
    fn test_watson_crick_pairs() {
        assert!(is_valid_pair(&token(Base::A, 0.0), &token(Base::T, 0.0)));
        assert!(is_valid_pair(&token(Base::T, 0.0), &token(Base::A, 0.0)));
        assert!(is_valid_pair(&token(Base::C, 0.0), &token(Base::G, 0.0)));
        assert!(is_valid_pair(&token(Base::G, 0.0), &token(Base::C, 0.0)));
        assert!(!is_valid_pair(&token(Base::A, 0.0), &token(Base::A, 0.0)));
        assert!(!is_valid_pair(&token(Base::A, 0.0), &token(Base::G, 0.0)));
    }

    #[test]
    fn test_pairing_is_symmetric() {
        for a in Base::ALL {
            for b in Base::ALL {
                assert_eq!(
                    PairingSet::for_base(a).contains(b),
                    PairingSet::for_base(b).contains(a)
                );
            }
        }
    }

    #[test]
    fn test_orientation_accepts_half_turns_only() {
        assert!(is_valid_orientation(&token(Base::T, 0.0)));
        assert!(is_valid_orientation(&token(Base::T, 180.0)));
        assert!(is_valid_orientation(&token(Base::T, 360.0)));
        assert!(is_valid_orientation(&token(Base::T, -180.0)));
        assert!(!is_valid_orientation(&token(Base::T, 90.0)));
        assert!(!is_valid_orientation(&token(Base::T, 270.0)));
    }

    #[test]
    fn test_orientation_only_checked_on_rotation_levels() {
        let head = token(Base::A, 0.0);
        let rotated = token(Base::T, 90.0);
        assert_eq!(MatchValidator::new(false).validate(&head, &rotated), Verdict::Match);
        assert_eq!(
            MatchValidator::new(true).validate(&head, &rotated),
            Verdict::Misoriented
        );
    }

    #[test]
    fn test_mismatch_wins_over_orientation() {
        let head = token(Base::A, 0.0);
        let wrong = token(Base::G, 90.0);
        assert_eq!(MatchValidator::new(true).validate(&head, &wrong), Verdict::Mismatch);
    }

    #[test]
    fn test_valid_match_of() {
        assert_eq!(valid_match_of(&token(Base::A, 0.0)), Some(Base::T));
        assert_eq!(valid_match_of(&token(Base::G, 0.0)), Some(Base::C));
    }
}
