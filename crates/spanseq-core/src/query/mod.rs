//! Clause trees.
//!
//! A pattern is an immutable tree of [`ClauseNode`]s shared through
//! [`Clause`] (`Arc<ClauseNode>`). Rewrites never mutate a node; they build new
//! ones and reuse untouched subtrees.
//!
//! Trees serialize as internally tagged JSON:
//!
//! ```json
//! {"type": "sequence", "clauses": [
//!     {"type": "token", "value": "the"},
//!     {"type": "any_token", "bounds": {"min": 1, "max": 3}}
//! ]}
//! ```

mod cost;
mod props;
mod rewrite;

pub use cost::{TOKEN_FORWARD_COST, UNBOUNDED_STEPS};
pub use props::non_empty_alternatives;
pub use rewrite::Rewriter;

use crate::error::{Error, Result};
use crate::span::Position;
use crate::terms::MatchSensitivity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared, immutable clause.
pub type Clause = Arc<ClauseNode>;

/// Field used by token clauses that do not name one.
pub const DEFAULT_FIELD: &str = "word";

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

/// Repetition / length bounds. `max == None` is unbounded.
///
/// Build with [`Bounds::new`] to validate. Literals with `min > max` are
/// rejected with [`Error::InvalidBounds`] once planned into streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct Bounds {
    /// Minimum (inclusive).
    pub min: u32,
    /// Maximum (inclusive), `None` for unbounded.
    pub max: Option<u32>,
}

#[derive(Deserialize)]
struct RawBounds {
    #[serde(default)]
    min: u32,
    #[serde(default)]
    max: Option<u32>,
}

impl TryFrom<RawBounds> for Bounds {
    type Error = Error;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl Bounds {
    /// Exactly one.
    pub const ONE: Self = Self {
        min: 1,
        max: Some(1),
    };

    /// Zero or one.
    pub const OPTIONAL: Self = Self {
        min: 0,
        max: Some(1),
    };

    /// Zero or more.
    pub const ANY: Self = Self { min: 0, max: None };

    /// Creates bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `min > max`.
    pub fn new(min: u32, max: Option<u32>) -> Result<Self> {
        match max {
            Some(max) if min > max => Err(Error::InvalidBounds { min, max }),
            _ => Ok(Self { min, max }),
        }
    }

    /// `{n,n}`.
    #[must_use]
    pub const fn exactly(n: u32) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// `{n,}`.
    #[must_use]
    pub const fn at_least(n: u32) -> Self {
        Self { min: n, max: None }
    }

    /// True if `min == max`.
    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        matches!(self.max, Some(max) if max == self.min)
    }

    /// Bounds of two consecutive parts: `{a+c, b+d}`.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self {
            min: self.min.saturating_add(other.min),
            max: self
                .max
                .zip(other.max)
                .map(|(a, b)| a.saturating_add(b)),
        }
    }

    /// Bounds of `other` repetitions of something bounded by `self`.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        let max = match (self.max, other.max) {
            (Some(0), _) | (_, Some(0)) => Some(0),
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        };
        Self {
            min: self.min.saturating_mul(other.min),
            max,
        }
    }

    /// Number of distinct values, `None` if unbounded.
    #[must_use]
    pub fn width(&self) -> Option<u32> {
        self.max.map(|max| max.saturating_sub(self.min) + 1)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{{{}}}", self.min),
            Some(max) => write!(f, "{{{},{max}}}", self.min),
            None => write!(f, "{{{},}}", self.min),
        }
    }
}

/// Side an expansion grows on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards the document start.
    Left,
    /// Towards the document end.
    Right,
}

/// Direction a forward-index NFA consumes tokens in, relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDirection {
    /// From the anchor's end towards the document end.
    Forward,
    /// From the anchor's start towards the document start.
    Backward,
}

/// Relation a position filter checks between a producer window `w` and a
/// filter hit `f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// `f` lies inside `w`.
    Containing,
    /// `w` lies inside `f`.
    Within,
    /// Both start at the same position.
    StartsAt,
    /// Both end at the same position.
    EndsAt,
    /// Same start and end.
    Matches,
    /// `f` inside `w`, sharing its start.
    ContainingAtStart,
    /// `f` inside `w`, sharing its end.
    ContainingAtEnd,
}

impl FilterOp {
    /// True if filter hit `f` satisfies the relation with window `w`.
    #[must_use]
    pub fn accepts(self, w: (Position, Position), f: (Position, Position)) -> bool {
        let contains = f.0 >= w.0 && f.1 <= w.1;
        match self {
            Self::Containing => contains,
            Self::Within => w.0 >= f.0 && w.1 <= f.1,
            Self::StartsAt => f.0 == w.0,
            Self::EndsAt => f.1 == w.1,
            Self::Matches => f == w,
            Self::ContainingAtStart => contains && f.0 == w.0,
            Self::ContainingAtEnd => contains && f.1 == w.1,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Containing => "containing",
            Self::Within => "within",
            Self::StartsAt => "starts_at",
            Self::EndsAt => "ends_at",
            Self::Matches => "matches",
            Self::ContainingAtStart => "containing_at_start",
            Self::ContainingAtEnd => "containing_at_end",
        };
        f.write_str(name)
    }
}

/// One node of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClauseNode {
    /// A single token whose `field` value equals `value` under `sensitivity`.
    Token {
        /// Annotation to match.
        #[serde(default = "default_field")]
        field: String,
        /// Term to match.
        value: String,
        /// Comparison strictness.
        #[serde(default)]
        sensitivity: MatchSensitivity,
    },
    /// `[]{min,max}`: any tokens.
    AnyToken {
        /// Number of tokens.
        bounds: Bounds,
    },
    /// A single token not matched by `clause`.
    Not {
        /// Single-token clause to exclude.
        clause: Clause,
    },
    /// `clause{min,max}`: abutting repetitions.
    Repetition {
        /// Repeated clause.
        clause: Clause,
        /// Number of repetitions.
        bounds: Bounds,
    },
    /// `clause` grown by `bounds` arbitrary tokens on one side.
    Expansion {
        /// Expanded clause.
        clause: Clause,
        /// Side to grow on.
        direction: Direction,
        /// Number of added tokens.
        bounds: Bounds,
    },
    /// Producer hits that (do not, if `invert`) stand in `op` relation to some
    /// filter hit. Matching uses the producer hit adjusted by
    /// `left_adjust`/`right_adjust`; the unadjusted hit is returned.
    PositionFilter {
        /// Hits returned.
        producer: Clause,
        /// Hits tested against.
        filter: Clause,
        /// Relation to test.
        op: FilterOp,
        /// Keep producer hits with no related filter hit instead.
        #[serde(default)]
        invert: bool,
        /// Added to the producer start before testing.
        #[serde(default)]
        left_adjust: i32,
        /// Added to the producer end before testing.
        #[serde(default)]
        right_adjust: i32,
    },
    /// Clauses matched one after another.
    Sequence {
        /// Parts in text order.
        clauses: Vec<Clause>,
    },
    /// Union.
    Or {
        /// Alternatives.
        clauses: Vec<Clause>,
    },
    /// Hits of `anchor` extended by matching `nfa` token by token through the
    /// forward index.
    ForwardIndexSequence {
        /// Clause matched through the reverse index.
        anchor: Clause,
        /// Clause matched through the forward index.
        nfa: Clause,
        /// Side of the anchor `nfa` is matched on.
        direction: MatchDirection,
    },
    /// Placeholder for an unrestricted gap (`[]*` the user did not write).
    DefaultValue,
}

/// Token clause on `field`, matched case- and diacritics-sensitively.
#[must_use]
pub fn term(field: &str, value: &str) -> Clause {
    term_with(field, value, MatchSensitivity::Sensitive)
}

/// Token clause with an explicit sensitivity.
#[must_use]
pub fn term_with(field: &str, value: &str, sensitivity: MatchSensitivity) -> Clause {
    Arc::new(ClauseNode::Token {
        field: field.to_string(),
        value: value.to_string(),
        sensitivity,
    })
}

/// `[]{min,max}`.
#[must_use]
pub fn any_token(bounds: Bounds) -> Clause {
    Arc::new(ClauseNode::AnyToken { bounds })
}

/// Single token not matched by `clause`.
#[must_use]
pub fn not(clause: Clause) -> Clause {
    Arc::new(ClauseNode::Not { clause })
}

/// `clause{min,max}`.
#[must_use]
pub fn repetition(clause: Clause, bounds: Bounds) -> Clause {
    Arc::new(ClauseNode::Repetition { clause, bounds })
}

/// `clause` grown by `bounds` tokens to `direction`.
#[must_use]
pub fn expansion(clause: Clause, direction: Direction, bounds: Bounds) -> Clause {
    Arc::new(ClauseNode::Expansion {
        clause,
        direction,
        bounds,
    })
}

/// Sequence of `clauses`.
#[must_use]
pub fn sequence(clauses: Vec<Clause>) -> Clause {
    Arc::new(ClauseNode::Sequence { clauses })
}

/// Union of `clauses`.
#[must_use]
pub fn or(clauses: Vec<Clause>) -> Clause {
    Arc::new(ClauseNode::Or { clauses })
}

/// Position filter without adjustment.
#[must_use]
pub fn position_filter(producer: Clause, filter: Clause, op: FilterOp, invert: bool) -> Clause {
    Arc::new(ClauseNode::PositionFilter {
        producer,
        filter,
        op,
        invert,
        left_adjust: 0,
        right_adjust: 0,
    })
}

/// Unrestricted gap placeholder.
#[must_use]
pub fn default_value() -> Clause {
    Arc::new(ClauseNode::DefaultValue)
}

impl ClauseNode {
    /// Parses a clause tree from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on malformed input or invalid bounds.
    pub fn from_json(json: &str) -> Result<Clause> {
        Ok(Arc::new(serde_json::from_str(json)?))
    }

    /// Short name of the variant, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::AnyToken { .. } => "any_token",
            Self::Not { .. } => "not",
            Self::Repetition { .. } => "repetition",
            Self::Expansion { .. } => "expansion",
            Self::PositionFilter { .. } => "position_filter",
            Self::Sequence { .. } => "sequence",
            Self::Or { .. } => "or",
            Self::ForwardIndexSequence { .. } => "forward_index_sequence",
            Self::DefaultValue => "default_value",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, clauses: &[Clause], sep: &str) -> fmt::Result {
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{clause}")?;
    }
    Ok(())
}

impl fmt::Display for ClauseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token {
                field,
                value,
                sensitivity,
            } => {
                let flag = match sensitivity {
                    MatchSensitivity::Sensitive => "",
                    MatchSensitivity::Insensitive => "(?i)",
                    MatchSensitivity::CaseInsensitive => "(?c)",
                    MatchSensitivity::DiacriticsInsensitive => "(?d)",
                };
                write!(f, "{field}=\"{flag}{value}\"")
            }
            Self::AnyToken { bounds } => write!(f, "[]{bounds}"),
            Self::Not { clause } => write!(f, "!{clause}"),
            Self::Repetition { clause, bounds } => write!(f, "({clause}){bounds}"),
            Self::Expansion {
                clause,
                direction,
                bounds,
            } => {
                let side = match direction {
                    Direction::Left => "L",
                    Direction::Right => "R",
                };
                write!(f, "EXPAND({clause}, {side}, {bounds})")
            }
            Self::PositionFilter {
                producer,
                filter,
                op,
                invert,
                left_adjust,
                right_adjust,
            } => {
                let not = if *invert { "NOT " } else { "" };
                write!(f, "POSFILTER({producer}, {filter}, {not}{op}")?;
                if *left_adjust != 0 || *right_adjust != 0 {
                    write!(f, ", {left_adjust}, {right_adjust}")?;
                }
                f.write_str(")")
            }
            Self::Sequence { clauses } => {
                f.write_str("(")?;
                write_list(f, clauses, " ")?;
                f.write_str(")")
            }
            Self::Or { clauses } => {
                f.write_str("(")?;
                write_list(f, clauses, " | ")?;
                f.write_str(")")
            }
            Self::ForwardIndexSequence {
                anchor,
                nfa,
                direction,
            } => {
                let dir = match direction {
                    MatchDirection::Forward => "FWD",
                    MatchDirection::Backward => "BWD",
                };
                write!(f, "FISEQ({anchor}, NFA:{nfa}, {dir})")
            }
            Self::DefaultValue => f.write_str("_"),
        }
    }
}
