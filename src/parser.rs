//! Recursive-descent parser producing a [`Program`].
//!
//! The parser keeps one current token and at most one token of lookahead.
//! Lookahead is only needed to tell a call (`f(`) from a variable (`f`).
//!
//! Grammar:
//!
//! ```text
//! Program := Decl*
//! Decl    := "def" IDENT "(" (IDENT ("," IDENT)*)? ")" "=" Expr | Expr
//! Expr    := Primary (("+" | "-") Expr)?
//! Primary := NUMBER
//!          | IDENT "(" (Expr ("," Expr)*)? ")"
//!          | "if" Expr "=" Expr "then" Expr "else" Expr
//!          | IDENT
//! ```
//!
//! `Expr` recurses on its right operand, so `a + b + c` groups as
//! `a + (b + c)`. Every recursive path runs through `Expr`, so nesting is
//! capped there at [`MAX_NESTING`] levels. The later passes recurse over the
//! same tree and stay within the native stack as a result.

use snafu::ensure;
use tracing::debug;

use crate::ast::{BinaryOp, Decl, Expr, ExpressionStatement, FunctionDecl, Param, Program};
use crate::error::{CompileResult, Location, NestingTooDeepSnafu, UnexpectedTokenSnafu};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token, token_text};

/// Parse a complete program straight from source text.
pub fn parse(source: &str) -> CompileResult<Program> {
  Parser::new(source, Lexer::new(source))?.parse_program()
}

/// Parse a program from tokens that were already lexed from `source`.
pub fn parse_tokens(source: &str, tokens: Vec<Token>) -> CompileResult<Program> {
  Parser::new(source, tokens.into_iter().map(Ok))?.parse_program()
}

/// Deepest expression nesting accepted, counting each operand of a chain.
pub const MAX_NESTING: usize = 256;

pub struct Parser<'a, I> {
  tokens: I,
  source: &'a str,
  current: Token,
  lookahead: Option<Token>,
  depth: usize,
}

impl<'a, I> Parser<'a, I>
where
  I: Iterator<Item = CompileResult<Token>>,
{
  /// Take ownership of the token source and load the first token.
  pub fn new(source: &'a str, mut tokens: I) -> CompileResult<Self> {
    let current = tokens
      .next()
      .transpose()?
      .unwrap_or_else(|| Token::new(TokenKind::Eof, source.len(), 0, None));
    Ok(Self {
      tokens,
      source,
      current,
      lookahead: None,
      depth: 0,
    })
  }

  pub fn parse_program(mut self) -> CompileResult<Program> {
    let mut decls = Vec::new();
    while !self.is_eof() {
      decls.push(self.parse_decl()?);
    }
    debug!(decls = decls.len(), "parsed program");
    Ok(Program { decls })
  }

  fn parse_decl(&mut self) -> CompileResult<Decl> {
    if !self.equal(TokenKind::Def)? {
      let expr = self.parse_expr()?;
      return Ok(Decl::Expr(ExpressionStatement { expr }));
    }

    let name = self.consume_ident("expected a function name after 'def'")?;
    self.consume(TokenKind::LParen, "expected '(' after the function name")?;

    let mut params = Vec::new();
    if self.current.kind == TokenKind::Ident {
      loop {
        let name = self.consume_ident("expected a parameter name")?;
        params.push(Param { name });
        if !self.equal(TokenKind::Comma)? {
          break;
        }
      }
    }

    self.consume(TokenKind::RParen, "expected ')' after the parameter list")?;
    self.consume(TokenKind::Equal, "expected '=' before the function body")?;
    let body = self.parse_expr()?;

    Ok(Decl::Function(FunctionDecl { name, params, body }))
  }

  fn parse_expr(&mut self) -> CompileResult<Expr> {
    ensure!(
      self.depth < MAX_NESTING,
      NestingTooDeepSnafu {
        limit: MAX_NESTING,
        at: Location::at(self.source, self.current.loc),
      }
    );
    self.depth += 1;
    let expr = self.parse_chain();
    self.depth -= 1;
    expr
  }

  fn parse_chain(&mut self) -> CompileResult<Expr> {
    let lhs = self.parse_primary()?;

    let op = match self.current.kind {
      TokenKind::Plus => BinaryOp::Plus,
      TokenKind::Minus => BinaryOp::Minus,
      _ => return Ok(lhs),
    };
    self.advance()?;
    let rhs = self.parse_expr()?;
    Ok(Expr::binary(op, lhs, rhs))
  }

  fn parse_primary(&mut self) -> CompileResult<Expr> {
    let kind = self.current.kind;
    match kind {
      TokenKind::Number => {
        let token = self.consume(TokenKind::Number, "expected a number")?;
        // number tokens always carry their value
        Ok(Expr::number(token.value.unwrap_or_default()))
      }
      TokenKind::Ident if self.peek_kind()? == TokenKind::LParen => self.parse_call(),
      TokenKind::Ident => {
        let name = self.consume_ident("expected an identifier")?;
        Ok(Expr::variable(name))
      }
      TokenKind::If => self.parse_if(),
      _ => self.unexpected("expected an expression"),
    }
  }

  fn parse_call(&mut self) -> CompileResult<Expr> {
    let name = self.consume_ident("expected a function name")?;
    self.consume(TokenKind::LParen, "expected '(' to start the argument list")?;

    let mut args = Vec::new();
    if self.current.kind != TokenKind::RParen {
      loop {
        args.push(self.parse_expr()?);
        if !self.equal(TokenKind::Comma)? {
          break;
        }
      }
    }

    self.consume(TokenKind::RParen, "expected ')' after the arguments")?;
    Ok(Expr::call(name, args))
  }

  fn parse_if(&mut self) -> CompileResult<Expr> {
    self.consume(TokenKind::If, "expected 'if'")?;
    let cond_lhs = self.parse_expr()?;
    self.consume(TokenKind::Equal, "expected '=' in the 'if' condition")?;
    let cond_rhs = self.parse_expr()?;
    self.consume(TokenKind::Then, "expected 'then'")?;
    let then_branch = self.parse_expr()?;
    self.consume(TokenKind::Else, "expected 'else'")?;
    let else_branch = self.parse_expr()?;
    Ok(Expr::if_else(cond_lhs, cond_rhs, then_branch, else_branch))
  }

  /// Move to the next token, draining the lookahead slot first. Once the
  /// source is exhausted the current token stays `Eof`.
  fn advance(&mut self) -> CompileResult<()> {
    let next = match self.lookahead.take() {
      Some(token) => Some(token),
      None => self.tokens.next().transpose()?,
    };
    if let Some(token) = next {
      self.current = token;
    }
    Ok(())
  }

  /// Kind of the token after the current one, without consuming anything.
  /// Must not be called again before the next `advance`.
  fn peek_kind(&mut self) -> CompileResult<TokenKind> {
    debug_assert!(self.lookahead.is_none(), "peeked twice without advancing");
    if self.lookahead.is_none() {
      self.lookahead = self.tokens.next().transpose()?;
    }
    Ok(self.lookahead.as_ref().map_or(TokenKind::Eof, |t| t.kind))
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> CompileResult<bool> {
    if self.current.kind != kind {
      return Ok(false);
    }
    self.advance()?;
    Ok(true)
  }

  fn consume(&mut self, kind: TokenKind, message: &str) -> CompileResult<Token> {
    if self.current.kind != kind {
      return self.unexpected(message);
    }
    let token = self.current.clone();
    self.advance()?;
    Ok(token)
  }

  fn consume_ident(&mut self, message: &str) -> CompileResult<String> {
    let token = self.consume(TokenKind::Ident, message)?;
    Ok(token_text(&token, self.source).to_string())
  }

  fn unexpected<T>(&self, message: &str) -> CompileResult<T> {
    UnexpectedTokenSnafu {
      message,
      got: describe_token(Some(&self.current), self.source),
      at: Location::at(self.source, self.current.loc),
    }
    .fail()
  }

  fn is_eof(&self) -> bool {
    self.current.kind == TokenKind::Eof
  }
}
