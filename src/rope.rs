//! The rope facade: sequence operations, cumulative sums, positional
//! queries over a weight-balanced tree of line groups.

use memchr::memchr_iter;

use crate::node::{self, Node};
use crate::{Dim, LenPair, Result, RleGroup, RopeError};

/// Dynamic sequence of line groups with cached cumulative sums.
///
/// Single-threaded by design: the rope owns its tree exclusively and
/// performs no internal synchronization. Callers needing shared access
/// serialize externally.
#[derive(Clone, Debug, Default)]
pub struct SumRope {
    root: Option<Node>,
}

/// Result of a positional query: where a cumulative offset lands.
#[derive(Debug)]
pub struct QueryResult<'a> {
    /// Global index of the line containing the offset
    pub line: usize,
    /// Sum of all lines before it
    pub line_start: LenPair,
    /// Both coordinates of the queried offset; its queried component
    /// equals the input value (clamped to the total)
    pub position: LenPair,
    /// The line's group (empty for an empty rope)
    pub group: RleGroup,
    /// Nodes visited root-to-leaf during the descent
    pub history: Vec<&'a Node>,
}

impl SumRope {
    /// An empty rope.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Build a balanced rope over `values`.
    pub fn from_groups(values: Vec<RleGroup>) -> Self {
        Self { root: node::build_balanced(values) }
    }

    /// Build from document text, one group per line.
    ///
    /// Every line keeps its trailing `'\n'` except the last; text ending
    /// in `'\n'` therefore yields a final empty line, mirroring the block
    /// layout of a host document ("a\n" is two blocks).
    pub fn from_text(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut groups = Vec::with_capacity(bytecount::count(bytes, b'\n') + 1);
        let mut start = 0;
        for nl in memchr_iter(b'\n', bytes) {
            groups.push(RleGroup::new(&text[start..=nl]));
            start = nl + 1;
        }
        groups.push(RleGroup::new(&text[start..]));
        Self::from_groups(groups)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, Node::len)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Structural root, for inspection and traversal.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Delete `old_count` lines starting at `start` and insert
    /// `new_values` in their place.
    ///
    /// Validates the range before touching the tree, so a failed call
    /// leaves the rope (and every cached sum) untouched.
    pub fn replace(
        &mut self,
        start: usize,
        old_count: usize,
        new_values: Vec<RleGroup>,
    ) -> Result<()> {
        let len = self.len();
        let end = start
            .checked_add(old_count)
            .ok_or(RopeError::InvalidArgument("line range overflows"))?;
        if end > len {
            return Err(RopeError::OutOfRange { index: end, len });
        }

        log::debug!(
            "replace: lines {}..{} ({} removed, {} inserted)",
            start,
            end,
            old_count,
            new_values.len()
        );

        let (left, tail) = match self.root.take() {
            Some(root) => root.split(start),
            None => (None, None),
        };
        let (_, right) = match tail {
            Some(tail) => tail.split(old_count),
            None => (None, None),
        };
        let mid = node::build_balanced(new_values);
        self.root = node::rebalance(node::concat(node::concat(left, mid), right));

        debug_assert!(self.root.as_ref().map_or(true, node::validate));
        Ok(())
    }

    /// The `(charlen, bytelen)` of line `index`.
    pub fn get_single(&self, index: usize) -> Result<LenPair> {
        self.get_group(index).map(RleGroup::as_pair)
    }

    /// The group at line `index`.
    pub fn get_group(&self, index: usize) -> Result<&RleGroup> {
        let len = self.len();
        let out_of_range = RopeError::OutOfRange { index, len };
        let mut node = match &self.root {
            Some(root) if index < len => root,
            _ => return Err(out_of_range),
        };

        let mut index = index;
        loop {
            match node {
                Node::Leaf(leaf) => {
                    return leaf.values().get(index).ok_or(out_of_range);
                }
                Node::Branch(branch) => {
                    let left_len = branch.left().map_or(0, Node::len);
                    node = if index < left_len {
                        match branch.left() {
                            Some(left) => left,
                            None => return Err(out_of_range),
                        }
                    } else {
                        index -= left_len;
                        match branch.right() {
                            Some(right) => right,
                            None => return Err(out_of_range),
                        }
                    };
                }
            }
        }
    }

    /// The `(charlen, bytelen)` pairs of lines `[start, end)`, clamped to
    /// the rope's bounds.
    pub fn get_range(&self, start: usize, end: usize) -> Vec<LenPair> {
        let len = self.len();
        let start = start.min(len);
        let end = end.min(len);
        if start >= end {
            return Vec::new();
        }

        let mut ret = Vec::with_capacity(end - start);
        let mut stack: Vec<(&Node, usize)> = match &self.root {
            Some(root) => vec![(root, 0)],
            None => Vec::new(),
        };

        while let Some((node, offset)) = stack.pop() {
            let node_end = offset + node.len();
            if node_end <= start || offset >= end {
                continue;
            }
            match node {
                Node::Leaf(leaf) => {
                    let lo = start.saturating_sub(offset);
                    let hi = (end - offset).min(leaf.len());
                    ret.extend(leaf.values()[lo..hi].iter().map(RleGroup::as_pair));
                }
                Node::Branch(branch) => {
                    // Push right first so left is processed first
                    let left_len = branch.left().map_or(0, Node::len);
                    if let Some(right) = branch.right() {
                        stack.push((right, offset + left_len));
                    }
                    if let Some(left) = branch.left() {
                        stack.push((left, offset));
                    }
                }
            }
        }
        ret
    }

    /// Assign one line. Sugar over [`SumRope::replace`].
    pub fn set_single(&mut self, index: usize, value: RleGroup) -> Result<()> {
        if index >= self.len() {
            return Err(RopeError::OutOfRange { index, len: self.len() });
        }
        self.replace(index, 1, vec![value])
    }

    /// Assign lines `[start, end)`. Sugar over [`SumRope::replace`].
    pub fn set_range(&mut self, start: usize, end: usize, values: Vec<RleGroup>) -> Result<()> {
        if end < start {
            return Err(RopeError::InvalidArgument("range end precedes start"));
        }
        self.replace(start, end - start, values)
    }

    /// Sum of lines `[0, index)`. `prefix_sum(0)` is zero and
    /// `prefix_sum(len)` equals [`SumRope::total_sum`].
    pub fn prefix_sum(&self, index: usize) -> Result<LenPair> {
        let len = self.len();
        if index > len {
            return Err(RopeError::OutOfRange { index, len });
        }
        Ok(self.root.as_ref().map_or(LenPair::ZERO, |root| root.prefix(index)))
    }

    /// Sum of lines `[start, end)`.
    pub fn range_sum(&self, start: usize, end: usize) -> Result<LenPair> {
        if end < start {
            return Err(RopeError::InvalidArgument("range end precedes start"));
        }
        Ok(self.prefix_sum(end)? - self.prefix_sum(start)?)
    }

    /// Total sum over all lines, cached at the root.
    pub fn total_sum(&self) -> LenPair {
        self.root.as_ref().map_or(LenPair::ZERO, Node::sum)
    }

    /// All line groups in order.
    pub fn to_groups(&self) -> Vec<RleGroup> {
        self.root.as_ref().map_or_else(Vec::new, Node::flatten)
    }

    /// Locate the line containing cumulative offset `value` along `dim`:
    /// the first line whose prefix sum strictly exceeds `value`.
    ///
    /// Never fails: `value` at or past the total lands on the last line
    /// with the position clamped to its end, and an empty rope reports
    /// line 0 with an empty group and no history.
    pub fn query(&self, value: usize, dim: Dim) -> QueryResult<'_> {
        let mut history = Vec::new();
        let root = match &self.root {
            Some(root) => root,
            None => {
                return QueryResult {
                    line: 0,
                    line_start: LenPair::ZERO,
                    position: LenPair::ZERO,
                    group: RleGroup::default(),
                    history,
                }
            }
        };

        let hit = root.query(value, dim, &mut history);
        match hit.group {
            Some(group) => {
                // The descent caps the in-line offset at the group's
                // extent, so resolution cannot go out of range.
                let within = group
                    .to_pair(hit.offset, dim)
                    .unwrap_or_else(|_| group.as_pair());
                QueryResult {
                    line: hit.line,
                    line_start: hit.start,
                    position: hit.start + within,
                    group: group.clone(),
                    history,
                }
            }
            None => QueryResult {
                line: 0,
                line_start: LenPair::ZERO,
                position: LenPair::ZERO,
                group: RleGroup::default(),
                history,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(lines: &[&str]) -> Vec<RleGroup> {
        lines.iter().map(|s| RleGroup::new(s)).collect()
    }

    fn pairs(rope: &SumRope) -> Vec<(usize, usize)> {
        rope.to_groups()
            .iter()
            .map(|g| (g.charlen(), g.bytelen()))
            .collect()
    }

    #[test]
    fn test_empty_rope() {
        let rope = SumRope::new();
        assert_eq!(rope.len(), 0);
        assert!(rope.is_empty());
        assert_eq!(rope.total_sum(), LenPair::ZERO);

        let hit = rope.query(0, Dim::Chars);
        assert_eq!(hit.line, 0);
        assert_eq!(hit.line_start, LenPair::ZERO);
        assert_eq!(hit.position, LenPair::ZERO);
        assert!(hit.group.is_empty());
        assert!(hit.history.is_empty());
    }

    #[test]
    fn test_from_text_line_layout() {
        let rope = SumRope::from_text("a\nb\nc");
        assert_eq!(rope.len(), 3);
        assert_eq!(rope.total_sum(), LenPair::new(5, 5));
        assert_eq!(pairs(&rope), vec![(2, 2), (2, 2), (1, 1)]);

        // trailing newline yields a final empty line
        let rope = SumRope::from_text("a\n");
        assert_eq!(rope.len(), 2);
        assert_eq!(pairs(&rope), vec![(2, 2), (0, 0)]);

        let rope = SumRope::from_text("");
        assert_eq!(rope.len(), 1);
        assert_eq!(rope.total_sum(), LenPair::ZERO);
    }

    #[test]
    fn test_query_char_dim() {
        let rope = SumRope::from_text("a\nb\nc");
        // char 3 is the newline of the second line
        let hit = rope.query(3, Dim::Chars);
        assert_eq!(hit.line, 1);
        assert_eq!(hit.line_start, LenPair::new(2, 2));
        assert_eq!(hit.position, LenPair::new(3, 3));

        // boundary offsets belong to the following line
        let hit = rope.query(2, Dim::Chars);
        assert_eq!(hit.line, 1);
        assert_eq!(hit.position, LenPair::new(2, 2));

        let hit = rope.query(0, Dim::Chars);
        assert_eq!(hit.line, 0);
        assert_eq!(hit.line_start, LenPair::ZERO);
        assert_eq!(hit.position, LenPair::ZERO);
        assert!(!hit.history.is_empty());
    }

    #[test]
    fn test_query_byte_dim_multibyte() {
        // "α\n" and "β": 2-byte character then newline, then a 2-byte line
        let rope = SumRope::from_groups(groups(&["\u{03b1}\n", "\u{03b2}"]));
        assert_eq!(rope.total_sum(), LenPair::new(3, 5));

        // byte 2 sits after the multibyte char, inside the first line
        let hit = rope.query(2, Dim::Bytes);
        assert_eq!(hit.line, 0);
        assert_eq!(hit.position, LenPair::new(1, 2));
    }

    #[test]
    fn test_query_clamps_past_total() {
        let rope = SumRope::from_text("a\nb\nc");
        let hit = rope.query(99, Dim::Chars);
        assert_eq!(hit.line, 2);
        assert_eq!(hit.line_start, LenPair::new(4, 4));
        assert_eq!(hit.position, LenPair::new(5, 5));
    }

    #[test]
    fn test_query_history_is_root_to_leaf() {
        let rope = SumRope::from_groups((0..200).map(|_| RleGroup::new("x\n")).collect());
        let hit = rope.query(150, Dim::Chars);
        assert_eq!(hit.history[0].len(), 200);
        assert!(matches!(hit.history.last(), Some(Node::Leaf(_))));
        // lengths shrink monotonically along the descent
        for pair in hit.history.windows(2) {
            assert!(pair[0].len() >= pair[1].len());
        }
    }

    #[test]
    fn test_replace_middle() {
        let mut rope = SumRope::from_groups(groups(&["abc\n", "def\n", "ghi"]));
        rope.replace(1, 1, groups(&["xx\n", "yy\n"])).unwrap();
        assert_eq!(rope.len(), 4);
        assert_eq!(pairs(&rope), vec![(4, 4), (3, 3), (3, 3), (3, 3)]);
        assert_eq!(rope.total_sum(), LenPair::new(13, 13));
        assert_eq!(rope.prefix_sum(2).unwrap(), LenPair::new(7, 7));
    }

    #[test]
    fn test_replace_insert_and_delete() {
        let mut rope = SumRope::from_groups(groups(&["a", "b"]));
        rope.replace(1, 0, groups(&["x"])).unwrap();
        assert_eq!(rope.len(), 3);

        rope.replace(0, 2, Vec::new()).unwrap();
        assert_eq!(rope.len(), 1);
        assert_eq!(rope.get_single(0).unwrap(), LenPair::new(1, 1));

        rope.replace(1, 0, groups(&["end"])).unwrap();
        assert_eq!(rope.len(), 2);
    }

    #[test]
    fn test_replace_into_empty() {
        let mut rope = SumRope::new();
        rope.replace(0, 0, groups(&["a\n", "b"])).unwrap();
        assert_eq!(rope.len(), 2);
        assert_eq!(rope.total_sum(), LenPair::new(3, 3));
    }

    #[test]
    fn test_replace_out_of_range_leaves_rope_intact() {
        let mut rope = SumRope::from_groups(groups(&["a", "b"]));
        let before = pairs(&rope);
        assert!(matches!(
            rope.replace(1, 2, Vec::new()),
            Err(RopeError::OutOfRange { .. })
        ));
        assert!(matches!(
            rope.replace(3, 0, Vec::new()),
            Err(RopeError::OutOfRange { .. })
        ));
        assert_eq!(pairs(&rope), before);
    }

    #[test]
    fn test_get_single_and_range() {
        let rope = SumRope::from_groups(groups(&["a", "bb", "ccc", "dddd"]));
        assert_eq!(rope.get_single(2).unwrap(), LenPair::new(3, 3));
        assert!(matches!(
            rope.get_single(4),
            Err(RopeError::OutOfRange { .. })
        ));

        let range = rope.get_range(1, 3);
        assert_eq!(range, vec![LenPair::new(2, 2), LenPair::new(3, 3)]);
        assert_eq!(rope.get_range(3, 1), Vec::new());
        assert_eq!(rope.get_range(2, 100).len(), 2);
    }

    #[test]
    fn test_set_single_and_range() {
        let mut rope = SumRope::from_groups(groups(&["a", "b", "c"]));
        rope.set_single(1, RleGroup::new("xyz")).unwrap();
        assert_eq!(rope.get_single(1).unwrap(), LenPair::new(3, 3));
        assert!(matches!(
            rope.set_single(3, RleGroup::new("w")),
            Err(RopeError::OutOfRange { .. })
        ));

        rope.set_range(0, 2, groups(&["q"])).unwrap();
        assert_eq!(rope.len(), 2);
        assert_eq!(rope.get_single(0).unwrap(), LenPair::new(1, 1));
    }

    #[test]
    fn test_prefix_and_range_sums() {
        let rope = SumRope::from_groups(groups(&["a", "bb", "ccc"]));
        assert_eq!(rope.prefix_sum(0).unwrap(), LenPair::ZERO);
        assert_eq!(rope.prefix_sum(1).unwrap(), LenPair::new(1, 1));
        assert_eq!(rope.prefix_sum(3).unwrap(), rope.total_sum());
        assert!(matches!(
            rope.prefix_sum(4),
            Err(RopeError::OutOfRange { .. })
        ));

        assert_eq!(rope.range_sum(0, 2).unwrap(), LenPair::new(3, 3));
        assert_eq!(rope.range_sum(2, 2).unwrap(), LenPair::ZERO);
        assert!(matches!(
            rope.range_sum(2, 1),
            Err(RopeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sum_with_unicode() {
        let rope = SumRope::from_groups(groups(&["caf\u{00e9}", "\u{1f30d}"]));
        let total = rope.total_sum();
        assert_eq!(total.charlen, 5);
        assert_eq!(total.bytelen, 9);
    }

    #[test]
    fn test_flatten_round_trip() {
        let rope = SumRope::from_groups(groups(&["abc\n", "\u{00e9}\u{00e9}\n", "", "x"]));
        let rebuilt = SumRope::from_groups(rope.to_groups());
        assert_eq!(rebuilt.to_groups(), rope.to_groups());
        assert_eq!(rebuilt.total_sum(), rope.total_sum());
    }
}
