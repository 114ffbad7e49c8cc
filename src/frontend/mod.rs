pub mod lexer;
pub mod line_dumper;
pub mod parser;
pub mod parser_error;
pub mod token;

pub use line_dumper::{LineDump, LineDumper};
pub use parser::Parser;
pub use parser_error::ParseError;
