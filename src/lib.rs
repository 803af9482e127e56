//! Crate root: wires together the compilation pipeline.
//!
//! Source text flows through small, independent stages:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` builds the `ast` with a recursive-descent parser.
//! - `frame` sizes every function's block of temp slots ahead of time.
//! - `codegen` lowers the tree into the typed MIPS instructions of `asm`,
//!   minting branch targets with `label`.
//! - `error` holds the single error type shared by all of them.

pub mod asm;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod frame;
pub mod label;
pub mod parser;
pub mod tokenizer;

pub use asm::Assembly;
pub use error::{CompileError, CompileResult, ErrorKind};

/// Compile a source string into an assembly module.
///
/// The whole input is lexed before parsing starts, so a bad character is
/// reported even when a syntax error precedes it.
pub fn compile(source: &str) -> CompileResult<Assembly> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse_tokens(source, tokens)?;
  let frames = frame::analyze(&program)?;
  codegen::generate(&program, &frames)
}

/// Compile a source string into SPIM assembly text.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  Ok(compile(source)?.to_string())
}
