//! Shared error type used across the compilation pipeline.
//!
//! Every failure is fatal: the first error aborts the compilation and no
//! partial output is produced. Lexing and parsing errors point at the
//! offending byte with a caret, in the style of chibicc. Later stages work on
//! the AST and name the identifier involved instead.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Broad classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lex,
  Parse,
  Semantic,
  Internal,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{at} unrecognized character '{ch}'"))]
  UnrecognizedCharacter { ch: char, at: Location },

  #[snafu(display("{at} invalid number \"{text}\": does not fit in a word"))]
  InvalidNumber { text: String, at: Location },

  #[snafu(display("{at} {message}, but got \"{got}\""))]
  UnexpectedToken {
    message: String,
    got: String,
    at: Location,
  },

  #[snafu(display("{at} expression nested more than {limit} levels deep"))]
  NestingTooDeep { limit: usize, at: Location },

  #[snafu(display("variable '{name}' used outside of a function body"))]
  VariableOutsideFunction { name: String },

  #[snafu(display("unknown variable '{name}' in function '{function}'"))]
  UnknownVariable { name: String, function: String },

  #[snafu(display("call to undeclared function '{name}'"))]
  UnknownFunction { name: String },

  #[snafu(display("'{name}' expects {expected} argument(s), but {found} were given"))]
  ArgumentCount {
    name: String,
    expected: usize,
    found: usize,
  },

  #[snafu(display("function '{name}' is declared more than once"))]
  DuplicateFunction { name: String },

  #[snafu(display("parameter '{name}' is repeated in function '{function}'"))]
  DuplicateParameter { function: String, name: String },

  #[snafu(display("'{name}' is reserved and cannot be declared as a function"))]
  ReservedName { name: String },

  #[snafu(display("frame of '{name}' needs {words} words, too many for a 16-bit offset"))]
  FrameTooLarge { name: String, words: usize },

  #[snafu(display("internal error: no frame record for '{name}'"))]
  FrameNotFound { name: String },
}

impl CompileError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::UnrecognizedCharacter { .. } | Self::InvalidNumber { .. } => ErrorKind::Lex,
      Self::UnexpectedToken { .. } | Self::NestingTooDeep { .. } => ErrorKind::Parse,
      Self::VariableOutsideFunction { .. }
      | Self::UnknownVariable { .. }
      | Self::UnknownFunction { .. }
      | Self::ArgumentCount { .. }
      | Self::DuplicateFunction { .. }
      | Self::DuplicateParameter { .. }
      | Self::ReservedName { .. }
      | Self::FrameTooLarge { .. } => ErrorKind::Semantic,
      Self::FrameNotFound { .. } => ErrorKind::Internal,
    }
  }
}

/// The source line holding an error, plus where on it the error sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  /// 1-based line number.
  pub line: usize,
  /// 0-based character column within the line.
  pub column: usize,
  pub line_text: String,
}

impl Location {
  /// Anchor a location at byte offset `loc` of `source`.
  pub fn at(source: &str, loc: usize) -> Self {
    let safe_loc = loc.min(source.len());
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |i| safe_loc + i);

    Self {
      line: source[..safe_loc].matches('\n').count() + 1,
      column: source[line_start..safe_loc].chars().count(),
      line_text: source[line_start..line_end].to_string(),
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // +1 accounts for the opening quote
    let marker = format!("{}^", " ".repeat(self.column + 1));
    write!(f, "'{}'\n{}", self.line_text, marker)
  }
}
