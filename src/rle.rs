//! Per-line width summary: a run-length encoding of UTF-8 byte widths.
//!
//! A line mixing ASCII and multibyte characters collapses to a handful of
//! runs, so byte<->char translation inside the line is a short walk with
//! exact integer arithmetic instead of a per-character table.

use smallvec::SmallVec;

use crate::{Dim, LenPair, Result, RopeError};

/// A maximal run of consecutive characters sharing one UTF-8 byte width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    /// Bytes per character, `1..=4`
    pub width: u8,
    /// Characters in the run, `>= 1`
    pub count: u32,
}

/// One line of a document, summarized as coalesced width runs plus cached
/// `(charlen, bytelen)` totals.
///
/// Invariants: no two adjacent runs share a width; `charlen == 0` exactly
/// when the run list is empty; `bytelen >= charlen`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RleGroup {
    runs: SmallVec<[Run; 4]>,
    charlen: usize,
    bytelen: usize,
}

impl RleGroup {
    /// Summarize a line of text. The empty string yields an empty group.
    pub fn new(text: &str) -> Self {
        let mut runs: SmallVec<[Run; 4]> = SmallVec::new();
        let mut charlen = 0;
        let mut bytelen = 0;

        for ch in text.chars() {
            let width = ch.len_utf8() as u8;
            match runs.last_mut() {
                Some(run) if run.width == width => run.count += 1,
                _ => runs.push(Run { width, count: 1 }),
            }
            charlen += 1;
            bytelen += width as usize;
        }

        Self { runs, charlen, bytelen }
    }

    /// Summarize a line given as raw bytes, validating the encoding first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match simdutf8::basic::from_utf8(bytes) {
            Ok(text) => Ok(Self::new(text)),
            Err(_) => Err(RopeError::InvalidEncoding),
        }
    }

    #[inline]
    pub fn charlen(&self) -> usize {
        self.charlen
    }

    #[inline]
    pub fn bytelen(&self) -> usize {
        self.bytelen
    }

    /// Extent of the line along one dimension.
    #[inline]
    pub fn len(&self, dim: Dim) -> usize {
        match dim {
            Dim::Chars => self.charlen,
            Dim::Bytes => self.bytelen,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[inline]
    pub fn as_pair(&self) -> LenPair {
        LenPair::new(self.charlen, self.bytelen)
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Byte offset at the start of character `c`.
    ///
    /// `char_to_byte(0) == 0` and `char_to_byte(charlen) == bytelen`.
    pub fn char_to_byte(&self, c: usize) -> Result<usize> {
        if c > self.charlen {
            return Err(RopeError::OutOfRange { index: c, len: self.charlen });
        }

        let mut chars = 0;
        let mut bytes = 0;
        for run in &self.runs {
            let count = run.count as usize;
            if chars + count >= c {
                return Ok(bytes + (c - chars) * run.width as usize);
            }
            chars += count;
            bytes += count * run.width as usize;
        }
        Ok(bytes)
    }

    /// Character offset at byte offset `b`: the largest `c` with
    /// `char_to_byte(c) <= b`.
    ///
    /// A byte offset landing inside a character truncates to that
    /// character's start; an offset exactly between two runs counts the
    /// characters of the preceding run only.
    pub fn byte_to_char(&self, b: usize) -> Result<usize> {
        if b > self.bytelen {
            return Err(RopeError::OutOfRange { index: b, len: self.bytelen });
        }

        let mut chars = 0;
        let mut bytes = 0;
        for run in &self.runs {
            let count = run.count as usize;
            let width = run.width as usize;
            let span = count * width;
            if bytes + span >= b {
                return Ok(chars + (b - bytes) / width);
            }
            chars += count;
            bytes += span;
        }
        Ok(chars)
    }

    /// Both coordinates of byte offset `b`: `(byte_to_char(b), b)`.
    pub fn byte_to_pair(&self, b: usize) -> Result<LenPair> {
        Ok(LenPair::new(self.byte_to_char(b)?, b))
    }

    /// Both coordinates of character offset `c`: `(c, char_to_byte(c))`.
    pub fn char_to_pair(&self, c: usize) -> Result<LenPair> {
        Ok(LenPair::new(c, self.char_to_byte(c)?))
    }

    /// Resolve an offset measured along `dim` to both coordinates.
    pub fn to_pair(&self, offset: usize, dim: Dim) -> Result<LenPair> {
        match dim {
            Dim::Chars => self.char_to_pair(offset),
            Dim::Bytes => self.byte_to_pair(offset),
        }
    }
}
