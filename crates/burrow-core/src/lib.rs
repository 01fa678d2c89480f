//! Burrow Core — position buffer, symbol model, and block-type line map

pub mod block_map;
pub mod error;
pub mod position;
pub mod symbol;


pub use block_map::BlockMap;
pub use error::IndexError;
pub use position::{Position, PositionBuffer};
pub use symbol::{
    BLOCK_PATH_SEP, BlockKind, FuncSymbol, GLOBAL_BLOCK, ImportSymbol, Scope, SymbolIndex,
    TypeSymbol, VarSymbol, join_block_path,
};
