//! Scope-qualified symbol index

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root sentinel for block paths; all top-level declarations live here.
pub const GLOBAL_BLOCK: &str = "Global";

/// Separator used when a block path is extended with a nested block name.
pub const BLOCK_PATH_SEP: char = '/';

/// Extend `parent` with one nested block name.
pub fn join_block_path(parent: &str, name: &str) -> String {
    format!("{parent}{BLOCK_PATH_SEP}{name}")
}

/// Half-open byte range of one syntactic construct. Doubles as the identity
/// key for the transient already-indexed set during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub start: usize,
    pub end: usize,
}

impl Scope {
    pub fn new(start: usize, end: usize) -> Self {
        Scope { start, end }
    }
}

/// Kinds of anonymous lexical blocks; named blocks use their own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Function,
    Lambda,
    Block,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Function => "func",
            BlockKind::Lambda => "lambda",
            BlockKind::Block => "block",
        }
    }
}

/// A declared variable, constant, parameter, return value, or struct field.
/// The name is absent for unnamed positional entries (e.g. `func(int)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSymbol {
    pub name: Option<String>,
    pub scope: Scope,
    pub type_desc: String,
    pub comment: String,
}

/// A declared function or method, with ordered parameter and return lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncSymbol {
    pub name: String,
    pub params: Vec<VarSymbol>,
    pub returns: Vec<VarSymbol>,
    pub scope: Scope,
    pub comment: String,
}

/// A declared named type; `fields` is empty for non-struct shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSymbol {
    pub name: String,
    pub type_desc: String,
    pub fields: Vec<VarSymbol>,
    pub scope: Scope,
    pub comment: String,
}

/// One import entry. The local name is the trailing path segment unless the
/// source gave an explicit alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSymbol {
    pub local_name: String,
    pub full_path: String,
    pub scope: Scope,
}

/// Four name→symbol mappings, each keyed first by block path and then by
/// identifier. Built in one walk over the syntax tree; never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolIndex {
    variables: HashMap<String, HashMap<String, VarSymbol>>,
    functions: HashMap<String, HashMap<String, FuncSymbol>>,
    types: HashMap<String, HashMap<String, TypeSymbol>>,
    imports: HashMap<String, Vec<ImportSymbol>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        SymbolIndex::default()
    }

    /// Record a variable under `block`. Unnamed symbols cannot be keyed and
    /// are dropped here; they only appear inside parameter and field lists.
    pub fn add_variable(&mut self, block: &str, symbol: VarSymbol) {
        let Some(name) = symbol.name.clone() else {
            return;
        };
        self.variables
            .entry(block.to_string())
            .or_default()
            .insert(name, symbol);
    }

    pub fn add_function(&mut self, block: &str, symbol: FuncSymbol) {
        self.functions
            .entry(block.to_string())
            .or_default()
            .insert(symbol.name.clone(), symbol);
    }

    pub fn add_type(&mut self, block: &str, symbol: TypeSymbol) {
        self.types
            .entry(block.to_string())
            .or_default()
            .insert(symbol.name.clone(), symbol);
    }

    pub fn add_import(&mut self, block: &str, symbol: ImportSymbol) {
        self.imports
            .entry(block.to_string())
            .or_default()
            .push(symbol);
    }

    pub fn variable(&self, block: &str, name: &str) -> Option<&VarSymbol> {
        self.variables.get(block)?.get(name)
    }

    pub fn function(&self, block: &str, name: &str) -> Option<&FuncSymbol> {
        self.functions.get(block)?.get(name)
    }

    pub fn named_type(&self, block: &str, name: &str) -> Option<&TypeSymbol> {
        self.types.get(block)?.get(name)
    }

    /// Flattened view of the variables declared directly under `block`.
    pub fn variables_in(&self, block: &str) -> Vec<&VarSymbol> {
        self.variables
            .get(block)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn functions_in(&self, block: &str) -> Vec<&FuncSymbol> {
        self.functions
            .get(block)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn types_in(&self, block: &str) -> Vec<&TypeSymbol> {
        self.types
            .get(block)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn imports_in(&self, block: &str) -> &[ImportSymbol] {
        self.imports.get(block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Linear scan over all import symbols for a matching local name.
    pub fn resolve_import(&self, local_name: &str) -> Option<&ImportSymbol> {
        self.imports
            .values()
            .flatten()
            .find(|import| import.local_name == local_name)
    }

    /// Block paths that hold at least one symbol of any kind.
    pub fn block_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .variables
            .keys()
            .chain(self.functions.keys())
            .chain(self.types.keys())
            .chain(self.imports.keys())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.functions.is_empty()
            && self.types.is_empty()
            && self.imports.is_empty()
    }
}
