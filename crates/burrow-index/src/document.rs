//! The document model: one atomically-replaceable index state per open file

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tree_sitter::{Node, Tree};

use burrow_core::{
    BlockMap, ImportSymbol, IndexError, Position, PositionBuffer, SymbolIndex,
};

use crate::parser::ParserPool;
use crate::walker::IndexBuilder;

/// File metadata carried alongside the index artifacts.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub line_count: usize,
}

/// Whether the last re-index succeeded. A Stale document keeps serving its
/// last valid artifacts until the next successful edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Valid,
    Stale,
}

/// Everything the server knows about one open file: position buffer, parse
/// tree, symbol index, block map, and metadata. Replaced wholesale on each
/// edit; queries borrow it read-only.
pub struct Document {
    file: FileInfo,
    source: String,
    buffer: PositionBuffer,
    tree: Tree,
    package: Option<String>,
    symbols: SymbolIndex,
    blocks: BlockMap,
    state: DocumentState,
}

impl Document {
    /// Parse `text` and build all index artifacts in one pass. A tree whose
    /// root contains syntax errors counts as a parse failure.
    pub fn parse(
        pool: &ParserPool,
        path: impl Into<PathBuf>,
        text: String,
    ) -> Result<Self, IndexError> {
        let path = path.into();
        let buffer = PositionBuffer::new(text.as_bytes());

        let tree = pool
            .parse_blocking(text.clone())
            .map_err(|_| IndexError::Parse { path: path.clone() })?;
        if tree.root_node().has_error() {
            return Err(IndexError::Parse { path });
        }

        let (symbols, blocks) =
            IndexBuilder::new(text.as_bytes(), buffer.line_count()).build(tree.root_node());
        // Captured while tree and text still agree; a later failed edit
        // replaces the text but keeps this tree.
        let package = package_clause(&tree, &text);

        Ok(Document {
            file: FileInfo {
                path,
                modified: Utc::now(),
                line_count: buffer.line_count(),
            },
            source: text,
            buffer,
            tree,
            package,
            symbols,
            blocks,
            state: DocumentState::Valid,
        })
    }

    /// Carry the previous artifacts over a text update whose re-parse
    /// failed: the buffer reflects the new text, everything else is served
    /// stale until the next good edit.
    pub(crate) fn with_failed_update(&self, text: String) -> Document {
        let buffer = PositionBuffer::new(text.as_bytes());
        Document {
            file: FileInfo {
                path: self.file.path.clone(),
                modified: Utc::now(),
                line_count: buffer.line_count(),
            },
            source: text,
            buffer,
            tree: self.tree.clone(),
            package: self.package.clone(),
            symbols: self.symbols.clone(),
            blocks: self.blocks.clone(),
            state: DocumentState::Stale,
        }
    }

    pub fn file(&self) -> &FileInfo {
        &self.file
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn buffer(&self) -> &PositionBuffer {
        &self.buffer
    }

    pub fn symbols(&self) -> &SymbolIndex {
        &self.symbols
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// The package name from the package clause, if the file has one. On a
    /// Stale document this is the last successfully parsed name; the current
    /// text cannot be sliced through the retained tree's byte ranges.
    pub fn package_name(&self) -> Option<String> {
        self.package.clone()
    }

    /// The partially typed word ending at the cursor: scans backward across
    /// letters and `.`, stopping at the first whitespace byte or column 0,
    /// then reverses into reading order. Recovers dotted accesses like
    /// `fmt.Pr`.
    pub fn cursor_word(&self, pos: Position) -> String {
        let mut word: Vec<u8> = Vec::new();
        let mut column = pos.column as i64;
        while column >= 0 {
            if let Some(b) = self
                .buffer
                .byte_at(Position::new(pos.line, column as u32))
            {
                if b.is_ascii_whitespace() {
                    break;
                }
                if b.is_ascii_alphabetic() || b == b'.' {
                    word.push(b);
                }
            }
            column -= 1;
        }
        word.reverse();
        String::from_utf8_lossy(&word).into_owned()
    }

    /// The block path owning the cursor's line.
    pub fn cursor_block(&self, pos: Position) -> &str {
        self.blocks.lookup(pos.line as usize)
    }

    /// Best-effort nearest enclosing top-level declaration: the last
    /// top-level node whose start line is not after the cursor. A Stale
    /// document answers nothing, since the retained tree's coordinates no
    /// longer line up with the published text.
    pub fn cursor_node(&self, pos: Position) -> Option<Node<'_>> {
        if self.state == DocumentState::Stale {
            return None;
        }
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let mut found = None;
        for child in root.named_children(&mut cursor) {
            if child.start_position().row as u32 > pos.line {
                break;
            }
            found = Some(child);
        }
        found
    }

    /// Resolve a local package name against the import table.
    pub fn resolve_import(&self, local_name: &str) -> Option<&ImportSymbol> {
        self.symbols.resolve_import(local_name)
    }
}

/// Read the identifier out of the package clause. Only valid while `source`
/// is the text `tree` was parsed from.
fn package_clause(tree: &Tree, source: &str) -> Option<String> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "package_clause" {
            continue;
        }
        let mut inner = child.walk();
        for part in child.named_children(&mut inner) {
            if part.kind() == "package_identifier" {
                return part.utf8_text(source.as_bytes()).ok().map(str::to_string);
            }
        }
    }
    None
}
