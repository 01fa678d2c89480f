//! Per-line record of which lexical block owns each line

use crate::symbol::GLOBAL_BLOCK;

/// Line → block-path array for O(1) "what scope am I in" queries.
///
/// Nested constructs are stamped after their enclosing construct, so the
/// innermost stamp wins for the lines it covers. The array is sized
/// `line_count + 1` to tolerate a final line without a terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockMap {
    lines: Vec<Option<String>>,
}

impl BlockMap {
    pub fn new(line_count: usize) -> Self {
        BlockMap {
            lines: vec![None; line_count + 1],
        }
    }

    /// Stamp every line from `start_line` through `end_line` inclusive
    /// (0-based rows) with `block_path`. Out-of-range rows are ignored.
    pub fn assign(&mut self, start_line: usize, end_line: usize, block_path: &str) {
        let last = end_line.min(self.lines.len().saturating_sub(1));
        for line in start_line..=last {
            if let Some(slot) = self.lines.get_mut(line) {
                *slot = Some(block_path.to_string());
            }
        }
    }

    /// The block path owning `line`, or the `Global` sentinel when the line
    /// is out of range or was never stamped.
    pub fn lookup(&self, line: usize) -> &str {
        self.lines
            .get(line)
            .and_then(|slot| slot.as_deref())
            .unwrap_or(GLOBAL_BLOCK)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
