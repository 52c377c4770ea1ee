//! Dual-dimension line-metrics rope.
//!
//! A document is modeled as a sequence of lines, each summarized by its
//! character count and UTF-8 byte count plus a run-length encoding of the
//! per-character byte widths. The sequence lives in a weight-balanced tree
//! with cached cumulative sums, giving:
//!
//! - O(log n) random access, range replacement, prefix and range sums
//! - O(log n) positional queries: map a document-global character or byte
//!   offset to the line containing it, with coordinates at the line start
//!   and at the offset itself
//!
//! The rope stores whole lines as atomic elements; it is not a
//! character-addressable text rope. Text itself is owned by the embedder
//! (or by [`LineIndex`], which pairs a `String` with its metrics rope).

use std::ops::{Add, AddAssign, Sub, SubAssign};

mod line_index;
mod node;
mod rle;
mod rope;

pub use line_index::LineIndex;
pub use node::{BranchNode, LeafNode, Node};
pub use rle::{RleGroup, Run};
pub use rope::{QueryResult, SumRope};

/// Maximum groups per leaf node
pub const CHUNK_SIZE: usize = 32;

/// Branch weight-imbalance factor that triggers a subtree rebuild
pub const BALANCE_RATIO: usize = 3;

// === Dimensions ===

/// Selects which component of a [`LenPair`] a sum or query runs over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Character (Unicode scalar) counts
    Chars = 0,
    /// UTF-8 byte counts
    Bytes = 1,
}

impl TryFrom<usize> for Dim {
    type Error = RopeError;

    fn try_from(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Dim::Chars),
            1 => Ok(Dim::Bytes),
            _ => Err(RopeError::InvalidArgument("dimension index must be 0 or 1")),
        }
    }
}

// === LenPair ===

/// A `(character count, UTF-8 byte count)` pair.
///
/// The additive monoid the tree sums over: identity [`LenPair::ZERO`],
/// pointwise addition and subtraction. For any text, `bytelen >= charlen`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LenPair {
    pub charlen: usize,
    pub bytelen: usize,
}

impl LenPair {
    pub const ZERO: LenPair = LenPair { charlen: 0, bytelen: 0 };

    #[inline]
    pub fn new(charlen: usize, bytelen: usize) -> Self {
        Self { charlen, bytelen }
    }

    /// Read one component.
    #[inline]
    pub fn get(self, dim: Dim) -> usize {
        match dim {
            Dim::Chars => self.charlen,
            Dim::Bytes => self.bytelen,
        }
    }
}

impl Add for LenPair {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        LenPair::new(self.charlen + rhs.charlen, self.bytelen + rhs.bytelen)
    }
}

impl AddAssign for LenPair {
    fn add_assign(&mut self, rhs: Self) {
        self.charlen += rhs.charlen;
        self.bytelen += rhs.bytelen;
    }
}

impl Sub for LenPair {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        debug_assert!(
            self.charlen >= rhs.charlen && self.bytelen >= rhs.bytelen,
            "LenPair subtraction would underflow: {:?} - {:?}",
            self,
            rhs
        );
        LenPair::new(self.charlen - rhs.charlen, self.bytelen - rhs.bytelen)
    }
}

impl SubAssign for LenPair {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

// === Errors ===

/// Unified error type for rope operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RopeError {
    /// An index or offset exceeds the valid interval
    OutOfRange { index: usize, len: usize },
    /// A malformed argument, e.g. a dimension index outside `{0, 1}`
    InvalidArgument(&'static str),
    /// Input bytes are not valid UTF-8
    InvalidEncoding,
}

impl std::fmt::Display for RopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            }
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::InvalidEncoding => write!(f, "text is not valid UTF-8"),
        }
    }
}

impl std::error::Error for RopeError {}

pub type Result<T> = std::result::Result<T, RopeError>;
