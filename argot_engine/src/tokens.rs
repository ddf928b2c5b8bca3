mod lexer;
mod model;
mod transform;

pub use lexer::{split_command_line, LexError, SeparatorStrategy, Tokenizer, TokenizerConfig};
pub use model::*;
pub use transform::*;
