//! Byte-exact mapping between buffer offsets and line/column coordinates

use serde::{Deserialize, Serialize};

/// One byte in a document, addressed by 0-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// Total mapping from every byte of a document to a `(line, column)` position.
///
/// A row ends with (and includes) its terminator byte; both `\r` and `\n`
/// terminate a row, so CRLF counts as two lines. The buffer is rebuilt from
/// scratch on every full-text replacement — there is no patch path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionBuffer {
    rows: Vec<Vec<u8>>,
    byte_len: usize,
    line_count: usize,
}

impl PositionBuffer {
    pub fn new(text: &[u8]) -> Self {
        let mut rows: Vec<Vec<u8>> = vec![Vec::new()];
        let mut line_count = 0usize;
        for &b in text {
            rows.last_mut()
                .expect("rows always holds the current row")
                .push(b);
            if b == b'\r' || b == b'\n' {
                line_count += 1;
                rows.push(Vec::new());
            }
        }
        PositionBuffer {
            rows,
            byte_len: text.len(),
            line_count,
        }
    }

    /// The byte stored at `pos`, or `None` when the position lies outside
    /// the document.
    pub fn byte_at(&self, pos: Position) -> Option<u8> {
        self.rows
            .get(pos.line as usize)
            .and_then(|row| row.get(pos.column as usize))
            .copied()
    }

    /// Number of line-terminator bytes in the source.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Total number of mapped bytes; always equals the source byte length.
    pub fn len(&self) -> usize {
        self.byte_len
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len == 0
    }
}
