//! Burrow Index — Go parsing, the syntax-tree walker, and the document store

pub mod document;
pub mod parser;
pub mod store;
pub mod walker;


pub use document::{Document, DocumentState, FileInfo};
pub use parser::{ParserPool, create_parser_pool};
pub use store::DocumentStore;
pub use walker::IndexBuilder;
