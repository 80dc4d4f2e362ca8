//! Filter predicate sets
//!
//! A [`Predicate`] is a bitmask over the fixed set of filter operations a
//! field or edge may expose on list endpoints. Groups are plain unions of the
//! atomic bits, so a per-field capability is always a single `u32`.

use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{BitOr, BitOrAssign, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Set of filter operations, stored as a bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "PredicateRepr")]
pub struct Predicate(u32);

impl Predicate {
    /// No filtering
    pub const NONE: Predicate = Predicate(0);

    /// Applies to the edge itself: the edge target's filterable fields are
    /// also exposed through the edge.
    pub const EDGE: Predicate = Predicate(1 << 0);

    pub const EQ: Predicate = FilterOp::Eq.predicate(); // =
    pub const NEQ: Predicate = FilterOp::Neq.predicate(); // <>
    pub const GT: Predicate = FilterOp::Gt.predicate(); // >
    pub const GTE: Predicate = FilterOp::Gte.predicate(); // >=
    pub const LT: Predicate = FilterOp::Lt.predicate(); // <
    pub const LTE: Predicate = FilterOp::Lte.predicate(); // <=
    pub const IS_NIL: Predicate = FilterOp::IsNil.predicate(); // IS NULL
    pub const NOT_NIL: Predicate = FilterOp::NotNil.predicate(); // IS NOT NULL
    pub const IN: Predicate = FilterOp::In.predicate();
    pub const NOT_IN: Predicate = FilterOp::NotIn.predicate();
    pub const EQUAL_FOLD: Predicate = FilterOp::EqualFold.predicate(); // equals, case-insensitive
    pub const CONTAINS: Predicate = FilterOp::Contains.predicate();
    pub const CONTAINS_FOLD: Predicate = FilterOp::ContainsFold.predicate(); // contains, case-insensitive
    pub const HAS_PREFIX: Predicate = FilterOp::HasPrefix.predicate();
    pub const HAS_SUFFIX: Predicate = FilterOp::HasSuffix.predicate();

    /// Includes: is nil.
    pub const GROUP_NIL: Predicate = Predicate(Self::IS_NIL.0);

    /// Includes: eq, neq, equal fold, is nil.
    pub const GROUP_EQUAL_EXACT: Predicate =
        Predicate(Self::EQ.0 | Self::NEQ.0 | Self::EQUAL_FOLD.0 | Self::GROUP_NIL.0);

    /// Includes: contains, contains fold, is nil.
    pub const GROUP_CONTAINS: Predicate =
        Predicate(Self::CONTAINS.0 | Self::CONTAINS_FOLD.0 | Self::GROUP_NIL.0);

    /// Includes: eq, neq, equal fold, contains, contains fold, prefix, suffix, is nil.
    pub const GROUP_EQUAL: Predicate = Predicate(
        Self::GROUP_EQUAL_EXACT.0
            | Self::GROUP_CONTAINS.0
            | Self::HAS_PREFIX.0
            | Self::HAS_SUFFIX.0,
    );

    /// Includes: gt, lt (gte/lte are rarely needed).
    pub const GROUP_LENGTH: Predicate = Predicate(Self::GT.0 | Self::LT.0);

    /// Includes: in, not in.
    pub const GROUP_ARRAY: Predicate = Predicate(Self::IN.0 | Self::NOT_IN.0);

    const ALL_BITS: u32 = (1 << 16) - 1;

    /// Named groups, in the order they are documented
    pub const GROUPS: [(&'static str, Predicate); 6] = [
        ("GroupEqualExact", Self::GROUP_EQUAL_EXACT),
        ("GroupEqual", Self::GROUP_EQUAL),
        ("GroupContains", Self::GROUP_CONTAINS),
        ("GroupNil", Self::GROUP_NIL),
        ("GroupLength", Self::GROUP_LENGTH),
        ("GroupArray", Self::GROUP_ARRAY),
    ];

    /// Raw bit value
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build a predicate from raw bits, dropping any unknown bits
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Predicate(bits & Self::ALL_BITS)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every operation in `other` is also in `self`.
    pub const fn has(self, other: Predicate) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both sets.
    #[must_use]
    pub const fn add(self, other: Predicate) -> Predicate {
        Predicate(self.0 | other.0)
    }

    /// Returns `self` with every operation in `other` cleared.
    #[must_use]
    pub const fn remove(self, other: Predicate) -> Predicate {
        Predicate(self.0 & !other.0)
    }

    /// Decompose into the atomic filter operations contained in the set,
    /// ascending by bit value. [`Predicate::EDGE`] is not a filter operation
    /// and never appears in the output.
    pub fn explode(self) -> Vec<FilterOp> {
        FilterOp::ALL
            .iter()
            .copied()
            .filter(|op| self.has(op.predicate()))
            .collect()
    }

    /// Canonical operation identifier of a single-operation predicate.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not exactly one filter operation (a group, a
    /// combination, `EDGE` or empty). This is a bug in the caller: use
    /// [`Predicate::explode`] first, or `FilterOp::try_from` where the input
    /// is not known to be atomic.
    pub fn op_name(self) -> &'static str {
        match FilterOp::try_from(self) {
            Ok(op) => op.name(),
            Err(_) => panic!(
                "Predicate::op_name called with grouped predicate {:#06x}, use explode() first",
                self.0
            ),
        }
    }

    /// Names of everything in the set: `Edge` first, then operation identifiers
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.has(Self::EDGE) {
            names.push("Edge");
        }
        names.extend(self.explode().into_iter().map(FilterOp::name));
        names
    }

    fn parse_single(name: &str) -> Result<Predicate> {
        let name = name.trim();

        if name.eq_ignore_ascii_case("edge") {
            return Ok(Self::EDGE);
        }

        if name.eq_ignore_ascii_case("none") {
            return Ok(Self::NONE);
        }

        if let Some((_, group)) = Self::GROUPS
            .iter()
            .find(|(group, _)| group.eq_ignore_ascii_case(name))
        {
            return Ok(*group);
        }

        FilterOp::ALL
            .iter()
            .find(|op| {
                op.name().eq_ignore_ascii_case(name) || op.param_token().eq_ignore_ascii_case(name)
            })
            .map(|op| op.predicate())
            .ok_or_else(|| GeneratorError::Parse(format!("unknown filter predicate: {:?}", name)))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join("|"))
    }
}

impl FromStr for Predicate {
    type Err = GeneratorError;

    /// Parses `|`-separated operation identifiers, query tokens, group names
    /// or `Edge`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        s.split('|')
            .filter(|part| !part.trim().is_empty())
            .try_fold(Predicate::NONE, |acc, part| {
                Ok(acc.add(Predicate::parse_single(part)?))
            })
    }
}

impl From<FilterOp> for Predicate {
    fn from(op: FilterOp) -> Self {
        op.predicate()
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.add(rhs)
    }
}

impl BitOrAssign for Predicate {
    fn bitor_assign(&mut self, rhs: Predicate) {
        *self = self.add(rhs);
    }
}

impl Sub for Predicate {
    type Output = Predicate;

    fn sub(self, rhs: Predicate) -> Predicate {
        self.remove(rhs)
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Accepted on-disk forms of a predicate
#[derive(Deserialize)]
#[serde(untagged)]
enum PredicateRepr {
    Bits(u32),
    Name(String),
    Names(Vec<String>),
}

impl TryFrom<PredicateRepr> for Predicate {
    type Error = GeneratorError;

    fn try_from(repr: PredicateRepr) -> Result<Self> {
        match repr {
            PredicateRepr::Bits(bits) if bits & !Predicate::ALL_BITS != 0 => Err(
                GeneratorError::Parse(format!("predicate bitmask {:#x} has unknown bits", bits)),
            ),
            PredicateRepr::Bits(bits) => Ok(Predicate(bits)),
            PredicateRepr::Name(name) => name.parse(),
            PredicateRepr::Names(names) => names
                .iter()
                .try_fold(Predicate::NONE, |acc, name| Ok(acc.add(name.parse()?))),
        }
    }
}

/// A single atomic filter operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNil,
    NotNil,
    In,
    NotIn,
    EqualFold,
    Contains,
    ContainsFold,
    HasPrefix,
    HasSuffix,
}

impl FilterOp {
    /// Every filter operation, ascending by bit value
    pub const ALL: [FilterOp; 15] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::IsNil,
        FilterOp::NotNil,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::EqualFold,
        FilterOp::Contains,
        FilterOp::ContainsFold,
        FilterOp::HasPrefix,
        FilterOp::HasSuffix,
    ];

    /// Single-bit predicate for this operation. Bit 0 is reserved for `EDGE`.
    pub const fn predicate(self) -> Predicate {
        Predicate(1 << (self as u32 + 1))
    }
}

/// Returned when a predicate does not hold exactly one filter operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("predicate {0} is not a single filter operation")]
pub struct NotAtomic(pub Predicate);

impl TryFrom<Predicate> for FilterOp {
    type Error = NotAtomic;

    fn try_from(predicate: Predicate) -> std::result::Result<Self, NotAtomic> {
        FilterOp::ALL
            .iter()
            .copied()
            .find(|op| op.predicate() == predicate)
            .ok_or(NotAtomic(predicate))
    }
}
