//! Host-free document model: a text buffer paired with its metrics rope.
//!
//! Plays the role a document widget plays for the rope: it owns the text,
//! turns edit notifications `(position, removed, inserted)` into
//! line-range replacements on the rope, and answers char/byte/line
//! conversions from the rope's sums.

use memchr::memchr_iter;

use crate::{Dim, LenPair, Result, RleGroup, RopeError, SumRope};

/// A document whose per-line `(charlen, bytelen)` metrics stay in sync
/// with its text across edits.
///
/// Line layout convention matches [`SumRope::from_text`]: every line keeps
/// its trailing `'\n'` except the last, so a document always has at least
/// one line and text ending in `'\n'` ends with an empty line.
#[derive(Clone, Debug)]
pub struct LineIndex {
    text: String,
    rope: SumRope,
}

impl LineIndex {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            rope: SumRope::from_text(text),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The metrics rope, for direct positional queries.
    pub fn rope(&self) -> &SumRope {
        &self.rope
    }

    pub fn line_count(&self) -> usize {
        self.rope.len()
    }

    pub fn total_chars(&self) -> usize {
        self.rope.total_sum().charlen
    }

    pub fn total_bytes(&self) -> usize {
        self.rope.total_sum().bytelen
    }

    /// Apply an edit notification: delete `chars_removed` characters at
    /// character position `char_pos`, then insert `insert` there.
    ///
    /// Rebuilds groups for exactly the dirtied line range and replaces
    /// them in the rope. Fails with `OutOfRange` if the removal window
    /// extends past the document; the document is untouched on failure.
    pub fn edit(&mut self, char_pos: usize, chars_removed: usize, insert: &str) -> Result<()> {
        let total = self.rope.total_sum();
        let end_chars = char_pos
            .checked_add(chars_removed)
            .ok_or(RopeError::InvalidArgument("edit window overflows"))?;
        if end_chars > total.charlen {
            return Err(RopeError::OutOfRange { index: end_chars, len: total.charlen });
        }

        let start_hit = self.rope.query(char_pos, Dim::Chars);
        let end_hit = self.rope.query(end_chars, Dim::Chars);
        let start_byte = start_hit.position.bytelen;
        let end_byte = end_hit.position.bytelen;
        let first_line = start_hit.line;
        let last_line = end_hit.line;

        log::trace!(
            "edit: chars {}..{} (+{} bytes) dirties lines {}..={}",
            char_pos,
            end_chars,
            insert.len(),
            first_line,
            last_line
        );

        // Dirtied region: from the start of the first affected line to the
        // end of the last, located in the pre-edit rope.
        let region_start = self.rope.prefix_sum(first_line)?.bytelen;
        let old_region_end = self.rope.prefix_sum(last_line + 1)?.bytelen;
        let tail = last_line + 1 == self.rope.len();

        self.text.replace_range(start_byte..end_byte, insert);
        let new_region_end = old_region_end - (end_byte - start_byte) + insert.len();

        let region = &self.text[region_start..new_region_end];
        let mut groups = Vec::with_capacity(bytecount::count(region.as_bytes(), b'\n') + 1);
        let mut seg_start = 0;
        for nl in memchr_iter(b'\n', region.as_bytes()) {
            groups.push(RleGroup::new(&region[seg_start..=nl]));
            seg_start = nl + 1;
        }
        if tail {
            // The final line of the document, even when empty
            groups.push(RleGroup::new(&region[seg_start..]));
        } else {
            // An interior region always ends at a line's newline
            debug_assert_eq!(seg_start, region.len());
        }

        self.rope.replace(first_line, last_line - first_line + 1, groups)?;
        debug_assert!(self.agrees_with_text());
        Ok(())
    }

    /// Byte offset of character position `pos`, clamped to the document
    /// end.
    pub fn char_to_byte(&self, pos: usize) -> usize {
        self.rope.query(pos, Dim::Chars).position.bytelen
    }

    /// Character offset of byte position `pos`, clamped to the document
    /// end. A position inside a multibyte character truncates to that
    /// character's start.
    pub fn byte_to_char(&self, pos: usize) -> usize {
        self.rope.query(pos, Dim::Bytes).position.charlen
    }

    /// Line containing character position `pos`, clamped to the last line.
    pub fn char_to_line(&self, pos: usize) -> usize {
        self.rope.query(pos, Dim::Chars).line
    }

    /// Line containing byte position `pos`, clamped to the last line.
    pub fn byte_to_line(&self, pos: usize) -> usize {
        self.rope.query(pos, Dim::Bytes).line
    }

    /// Character position of the start of `line`.
    pub fn line_to_char(&self, line: usize) -> Result<usize> {
        Ok(self.rope.prefix_sum(line)?.charlen)
    }

    /// Byte position of the start of `line`.
    pub fn line_to_byte(&self, line: usize) -> Result<usize> {
        Ok(self.rope.prefix_sum(line)?.bytelen)
    }

    /// Both coordinates of the start of `line`.
    pub fn line_start(&self, line: usize) -> Result<LenPair> {
        self.rope.prefix_sum(line)
    }

    /// The text of `line`, including its trailing newline if present.
    pub fn line_text(&self, line: usize) -> Result<&str> {
        if line >= self.rope.len() {
            return Err(RopeError::OutOfRange { index: line, len: self.rope.len() });
        }
        let start = self.rope.prefix_sum(line)?.bytelen;
        let end = self.rope.prefix_sum(line + 1)?.bytelen;
        Ok(&self.text[start..end])
    }

    fn agrees_with_text(&self) -> bool {
        SumRope::from_text(&self.text).to_groups() == self.rope.to_groups()
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::from_text("")
    }
}
