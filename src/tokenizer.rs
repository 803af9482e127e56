//! Lexical analysis: turns the raw input string into a stream of tokens.
//!
//! [`scan`] is a pure function from a position in the input to the next
//! token and the position after it, so each rule can be tested on its own.
//! [`Lexer`] wraps it with a cursor and the end-of-input bookkeeping: exactly
//! one `Eof` token is produced, after which the stream is exhausted.

use snafu::ensure;
use tracing::debug;

use crate::error::{
  CompileResult, InvalidNumberSnafu, Location, UnrecognizedCharacterSnafu,
};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  LParen,
  RParen,
  Comma,
  Number,
  Plus,
  Minus,
  Def,
  If,
  Then,
  Else,
  Equal,
  Ident,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i32>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i32>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

const KEYWORDS: [(&str, TokenKind); 4] = [
  ("def", TokenKind::Def),
  ("if", TokenKind::If),
  ("then", TokenKind::Then),
  ("else", TokenKind::Else),
];

/// ASCII whitespace plus vertical tab, which `u8::is_ascii_whitespace` leaves out.
fn is_space(c: u8) -> bool {
  c.is_ascii_whitespace() || c == b'\x0B'
}

fn is_word(c: u8) -> bool {
  c.is_ascii_alphanumeric() || c == b'_'
}

fn run_end(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
  let mut end = start;
  while end < bytes.len() && pred(bytes[end]) {
    end += 1;
  }
  end
}

/// Scan one token starting at byte offset `pos`, skipping leading whitespace.
///
/// Returns the token together with the offset just past it, or `None` once
/// only whitespace remains.
pub fn scan(source: &str, pos: usize) -> CompileResult<Option<(Token, usize)>> {
  let bytes = source.as_bytes();
  let start = run_end(bytes, pos, is_space);
  if start >= bytes.len() {
    return Ok(None);
  }

  let single = match bytes[start] {
    b'(' => Some(TokenKind::LParen),
    b')' => Some(TokenKind::RParen),
    b',' => Some(TokenKind::Comma),
    b'+' => Some(TokenKind::Plus),
    b'-' => Some(TokenKind::Minus),
    b'=' => Some(TokenKind::Equal),
    _ => None,
  };
  if let Some(kind) = single {
    return Ok(Some((Token::new(kind, start, 1, None), start + 1)));
  }

  if bytes[start].is_ascii_digit() {
    let end = run_end(bytes, start, |c| c.is_ascii_digit());
    let text = &source[start..end];
    let value = text.parse::<i32>().map_err(|_| {
      InvalidNumberSnafu {
        text,
        at: Location::at(source, start),
      }
      .build()
    })?;
    return Ok(Some((
      Token::new(TokenKind::Number, start, end - start, Some(value)),
      end,
    )));
  }

  // Keywords share the identifier character class, so the whole word is
  // scanned first and classified afterwards.
  let end = run_end(bytes, start, is_word);
  let ch = source[start..].chars().next().unwrap_or('\0');
  ensure!(
    end > start,
    UnrecognizedCharacterSnafu {
      ch,
      at: Location::at(source, start),
    }
  );

  let word = &source[start..end];
  let kind = KEYWORDS
    .iter()
    .find(|(keyword, _)| *keyword == word)
    .map_or(TokenKind::Ident, |(_, kind)| *kind);
  Ok(Some((Token::new(kind, start, end - start, None), end)))
}

/// Cursor over the source that hands out tokens one at a time.
#[derive(Debug)]
pub struct Lexer<'a> {
  source: &'a str,
  pos: usize,
  emitted_eof: bool,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      emitted_eof: false,
    }
  }

  /// Produce the next token. After the single `Eof` token every call returns
  /// `Ok(None)`.
  pub fn next_token(&mut self) -> CompileResult<Option<Token>> {
    match scan(self.source, self.pos) {
      Ok(Some((token, next))) => {
        self.pos = next;
        Ok(Some(token))
      }
      Ok(None) if self.emitted_eof => Ok(None),
      Ok(None) => {
        self.pos = self.source.len();
        self.emitted_eof = true;
        Ok(Some(Token::new(TokenKind::Eof, self.source.len(), 0, None)))
      }
      Err(err) => {
        // errors are fatal: leave the cursor exhausted
        self.pos = self.source.len();
        self.emitted_eof = true;
        Err(err)
      }
    }
  }
}

impl Iterator for Lexer<'_> {
  type Item = CompileResult<Token>;

  fn next(&mut self) -> Option<Self::Item> {
    self.next_token().transpose()
  }
}

/// Lex the whole input into a vector of tokens terminated by an `Eof` marker.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
  let tokens = Lexer::new(source).collect::<CompileResult<Vec<_>>>()?;
  debug!(tokens = tokens.len(), "tokenized source");
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}
