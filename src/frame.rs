//! Static frame sizing.
//!
//! Before any code is emitted we compute, for every function body and for the
//! top-level program, how many temp slots must be live at once while the body
//! is evaluated. The code generator uses the result to reserve a fixed block
//! of slots in each frame instead of growing the stack per operation.

use std::collections::{HashMap, HashSet};

use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::ast::{Decl, Expr, FunctionDecl, PRINT, Program};
use crate::error::{
  CompileResult, DuplicateFunctionSnafu, DuplicateParameterSnafu, FrameNotFoundSnafu,
  FrameTooLargeSnafu, ReservedNameSnafu,
};

/// Name of the implicit frame the top-level statements run in.
pub const MAIN_FRAME: &str = "main";

/// Largest frame, in words, whose byte size fits a signed 16-bit immediate.
pub const MAX_FRAME_WORDS: usize = i16::MAX as usize / 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub name: String,
  pub params: usize,
  pub temp_slots: usize,
}

impl Frame {
  /// Words popped by the epilogue: arguments, saved `$fp`, `$ra` and temps.
  pub fn words(&self) -> usize {
    self.params + self.temp_slots + 2
  }

  fn check_size(&self) -> CompileResult<()> {
    ensure!(
      self.words() <= MAX_FRAME_WORDS,
      FrameTooLargeSnafu {
        name: &self.name,
        words: self.words(),
      }
    );
    Ok(())
  }
}

/// Frame records keyed by function name, plus the top-level frame.
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
  program: Option<Frame>,
  functions: HashMap<String, Frame>,
}

impl FrameTable {
  /// Frame record of the top-level program.
  pub fn program(&self) -> CompileResult<&Frame> {
    self
      .program
      .as_ref()
      .context(FrameNotFoundSnafu { name: MAIN_FRAME })
  }

  /// Frame record of a declared function.
  pub fn lookup(&self, name: &str) -> CompileResult<&Frame> {
    self.get(name).context(FrameNotFoundSnafu { name })
  }

  pub fn get(&self, name: &str) -> Option<&Frame> {
    self.functions.get(name)
  }

  /// Number of function records, not counting the top-level frame.
  pub fn len(&self) -> usize {
    self.functions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.functions.is_empty()
  }

  fn declare(&mut self, function: &FunctionDecl) -> CompileResult<()> {
    ensure!(
      function.name != PRINT,
      ReservedNameSnafu {
        name: &function.name
      }
    );
    ensure!(
      !self.functions.contains_key(&function.name),
      DuplicateFunctionSnafu {
        name: &function.name
      }
    );

    let mut seen = HashSet::new();
    for param in &function.params {
      ensure!(
        seen.insert(param.name.as_str()),
        DuplicateParameterSnafu {
          function: &function.name,
          name: &param.name,
        }
      );
    }

    let frame = Frame {
      name: function.name.clone(),
      params: function.params.len(),
      temp_slots: temps(&function.body),
    };
    frame.check_size()?;
    trace!(function = %frame.name, params = frame.params, temp_slots = frame.temp_slots, "frame record");
    self.functions.insert(frame.name.clone(), frame);
    Ok(())
  }
}

/// Maximum number of temp slots live at once while evaluating `expr`.
pub fn temps(expr: &Expr) -> usize {
  match expr {
    Expr::Number { .. } | Expr::Variable { .. } => 0,
    // the left operand is parked in a slot while the right one is evaluated
    Expr::Binary { lhs, rhs, .. } => temps(lhs).max(temps(rhs) + 1),
    Expr::IfElse {
      cond_lhs,
      cond_rhs,
      then_branch,
      else_branch,
    } => temps(cond_lhs)
      .max(temps(cond_rhs) + 1)
      .max(temps(then_branch))
      .max(temps(else_branch)),
    // each argument is pushed before the next one is evaluated
    Expr::Call { args, .. } => args.iter().map(temps).max().unwrap_or(0),
  }
}

/// Build the frame table for a whole program.
///
/// Also rejects declarations the code generator could not lay out: duplicate
/// functions, repeated parameter names, functions named `print`, and frames
/// too large to address with an immediate offset.
pub fn analyze(program: &Program) -> CompileResult<FrameTable> {
  let mut table = FrameTable::default();
  let mut top_level = 0;

  for decl in &program.decls {
    match decl {
      Decl::Function(function) => table.declare(function)?,
      Decl::Expr(stmt) => top_level = top_level.max(temps(&stmt.expr)),
    }
  }

  let frame = Frame {
    name: MAIN_FRAME.to_string(),
    params: 0,
    temp_slots: top_level,
  };
  frame.check_size()?;
  table.program = Some(frame);
  debug!(
    functions = table.len(),
    top_level_temps = top_level,
    "analyzed frames"
  );
  Ok(table)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::BinaryOp;
  use crate::error::CompileError;
  use crate::parser::parse;

  fn setup(input: &str) -> FrameTable {
    analyze(&parse(input).unwrap()).expect("want to test a successful analysis")
  }

  fn setup_err(input: &str) -> CompileError {
    match analyze(&parse(input).unwrap()) {
      Err(err) => err,
      Ok(table) => unreachable!("want to test errors, got {table:?}"),
    }
  }

  fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(BinaryOp::Plus, lhs, rhs)
  }

  #[test]
  fn leaves_need_no_slots() {
    assert_eq!(temps(&Expr::number(1)), 0);
    assert_eq!(temps(&Expr::variable("x")), 0);
  }

  #[test]
  fn right_chain_grows_by_one_per_operator() {
    // 1 + (2 + (3 + 4))
    let expr = add(
      Expr::number(1),
      add(Expr::number(2), add(Expr::number(3), Expr::number(4))),
    );
    assert_eq!(temps(&expr), 3);
  }

  #[test]
  fn left_nesting_reuses_the_slot() {
    // ((1 + 2) + 3) + 4
    let expr = add(
      add(add(Expr::number(1), Expr::number(2)), Expr::number(3)),
      Expr::number(4),
    );
    assert_eq!(temps(&expr), 1);
  }

  #[test]
  fn binary_dominates_both_operands() {
    let samples = [
      (Expr::number(1), Expr::number(2)),
      (add(Expr::number(1), Expr::number(2)), Expr::number(3)),
      (
        Expr::number(1),
        add(Expr::number(2), add(Expr::number(3), Expr::number(4))),
      ),
      (
        add(add(Expr::number(1), Expr::number(2)), Expr::number(3)),
        Expr::call("f", vec![add(Expr::number(1), Expr::number(2))]),
      ),
    ];
    for (lhs, rhs) in samples {
      let node = add(lhs.clone(), rhs.clone());
      assert!(temps(&node) >= temps(&lhs));
      assert!(temps(&node) >= temps(&rhs) + 1);
    }
  }

  #[test]
  fn if_else_maxes_branches() {
    let expr = Expr::if_else(
      Expr::number(0),
      Expr::number(1),
      add(Expr::number(1), add(Expr::number(2), Expr::number(3))),
      Expr::number(4),
    );
    assert_eq!(temps(&expr), 2);

    let cond_only = Expr::if_else(
      Expr::number(0),
      Expr::number(1),
      Expr::number(3),
      Expr::number(4),
    );
    assert_eq!(temps(&cond_only), 1);
  }

  #[test]
  fn call_arguments_do_not_accumulate() {
    let expr = Expr::call(
      "f",
      vec![
        add(Expr::number(1), Expr::number(2)),
        add(Expr::number(3), Expr::number(4)),
        Expr::number(5),
      ],
    );
    assert_eq!(temps(&expr), 1);
    assert_eq!(temps(&Expr::call("g", vec![])), 0);
  }

  #[test]
  fn functions_and_top_level_are_sized_independently() {
    let table = setup("def f(a, b) = a + b + 1\n1\nf(1, 2) + 3");
    assert_eq!(
      table.lookup("f").unwrap(),
      &Frame {
        name: "f".to_string(),
        params: 2,
        temp_slots: 2,
      }
    );
    assert_eq!(table.program().unwrap().temp_slots, 1);
    assert_eq!(table.program().unwrap().name, MAIN_FRAME);
  }

  #[test]
  fn every_called_function_has_a_record() {
    let source = "a(1)\ndef a(x) = b(x) + c()\ndef b(y) = y\ndef c() = print(2)";
    let program = parse(source).unwrap();
    let table = analyze(&program).unwrap();
    assert_eq!(table.len(), 3);

    fn called(expr: &Expr, out: &mut Vec<String>) {
      match expr {
        Expr::Call { name, args } => {
          out.push(name.clone());
          args.iter().for_each(|arg| called(arg, out));
        }
        Expr::Binary { lhs, rhs, .. } => {
          called(lhs, out);
          called(rhs, out);
        }
        Expr::IfElse {
          cond_lhs,
          cond_rhs,
          then_branch,
          else_branch,
        } => {
          for e in [cond_lhs, cond_rhs, then_branch, else_branch] {
            called(e, out);
          }
        }
        Expr::Number { .. } | Expr::Variable { .. } => {}
      }
    }

    let mut names = Vec::new();
    for decl in &program.decls {
      match decl {
        Decl::Function(f) => called(&f.body, &mut names),
        Decl::Expr(stmt) => called(&stmt.expr, &mut names),
      }
    }
    for name in names.iter().filter(|name| *name != PRINT) {
      assert!(table.lookup(name).is_ok(), "missing frame for {name}");
    }
  }

  #[test]
  fn unknown_name_is_frame_not_found() {
    let table = setup("def f() = 1");
    assert!(matches!(
      table.lookup("g"),
      Err(CompileError::FrameNotFound { name }) if name == "g"
    ));
  }

  #[test]
  fn lookup_before_analysis_fails() {
    let table = FrameTable::default();
    assert!(matches!(
      table.program(),
      Err(CompileError::FrameNotFound { .. })
    ));
    assert!(table.lookup("f").is_err());
  }

  #[test]
  fn duplicate_function() {
    assert!(matches!(
      setup_err("def f() = 1\ndef f() = 2"),
      CompileError::DuplicateFunction { name } if name == "f"
    ));
  }

  #[test]
  fn duplicate_parameter() {
    assert!(matches!(
      setup_err("def f(a, a) = a"),
      CompileError::DuplicateParameter { function, name } if function == "f" && name == "a"
    ));
  }

  #[test]
  fn print_cannot_be_redeclared() {
    assert!(matches!(
      setup_err("def print(x) = x"),
      CompileError::ReservedName { .. }
    ));
  }

  #[test]
  fn oversized_frame_is_rejected() {
    let params = (0..MAX_FRAME_WORDS)
      .map(|i| format!("p{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    match setup_err(&format!("def wide({params}) = 1")) {
      CompileError::FrameTooLarge { name, words } => {
        assert_eq!(name, "wide");
        assert_eq!(words, MAX_FRAME_WORDS + 2);
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn frame_words_count_every_slot() {
    let table = setup("def f(a, b) = a + b");
    let frame = table.lookup("f").unwrap();
    assert_eq!(frame.words(), 2 + 1 + 2);
    assert!(frame.words() <= MAX_FRAME_WORDS);
  }
}
