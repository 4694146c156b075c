//! Binding path expressions: tokenizer, node model, parser.

pub mod tokenizer;
pub mod model;
pub mod parser;

pub use model::{BindingPath, Index, PathNode};
pub use parser::{parse_path, SyntaxError};
