//! Syntax tree produced by the parser and consumed by the later passes.
//!
//! The tree is a closed set of enums, so both the frame analyzer and the code
//! generator match on it exhaustively.

/// Name of the built-in that prints its single argument.
pub const PRINT: &str = "print";

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Plus,
  Minus,
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Number {
    value: i32,
  },
  Variable {
    name: String,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  /// Takes `then_branch` when the two condition operands are equal.
  IfElse {
    cond_lhs: Box<Expr>,
    cond_rhs: Box<Expr>,
    then_branch: Box<Expr>,
    else_branch: Box<Expr>,
  },
  Call {
    name: String,
    args: Vec<Expr>,
  },
}

impl Expr {
  pub fn number(value: i32) -> Self {
    Self::Number { value }
  }

  pub fn variable(name: impl Into<String>) -> Self {
    Self::Variable { name: name.into() }
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn if_else(cond_lhs: Expr, cond_rhs: Expr, then_branch: Expr, else_branch: Expr) -> Self {
    Self::IfElse {
      cond_lhs: Box::new(cond_lhs),
      cond_rhs: Box::new(cond_rhs),
      then_branch: Box::new(then_branch),
      else_branch: Box::new(else_branch),
    }
  }

  pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
    Self::Call {
      name: name.into(),
      args,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
  pub name: String,
  pub params: Vec<Param>,
  pub body: Expr,
}

impl FunctionDecl {
  /// Position of the parameter called `name`, found by linear search.
  pub fn param_index(&self, name: &str) -> Option<usize> {
    self.params.iter().position(|param| param.name == name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionStatement {
  pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
  Function(FunctionDecl),
  Expr(ExpressionStatement),
}

/// Top-level declarations in source order.
///
/// Expression statements run top to bottom; functions are hoisted and may be
/// called before their declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  pub decls: Vec<Decl>,
}
