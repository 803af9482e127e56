//! Code generation: lower the AST into MIPS assembly for a SPIM-style machine.
//!
//! Every expression leaves its value in the accumulator. Intermediate values
//! never go through push/pop: a binary operation parks its left operand in a
//! temp slot below `$fp`, at a depth that follows the same recursion as
//! [`frame::temps`], so the slots always fall inside the block the prologue
//! reserved. Call arguments are the only values pushed dynamically.
//!
//! Frame layout for a function with `n` parameters and `t` temp slots:
//!
//! ```text
//!   4*(n+1)($fp)   caller's $fp
//!   4*n($fp)       parameter n-1
//!   ...
//!   4($fp)         parameter 0
//!   0($fp)         return address
//!   -4($fp)        temp slot 1
//!   ...
//!   -4*t($fp)      temp slot t
//! ```
//!
//! The top-level statements run in a frame with the same shape and no
//! parameters.
//!
//! [`frame::temps`]: crate::frame::temps

use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::asm::{Assembly, Instruction, Reg, Syscall, WORD_SIZE};
use crate::ast::{BinaryOp, Decl, Expr, FunctionDecl, PRINT, Program};
use crate::error::{
  ArgumentCountSnafu, CompileResult, UnknownFunctionSnafu, UnknownVariableSnafu,
  VariableOutsideFunctionSnafu,
};
use crate::frame::{Frame, FrameTable, MAIN_FRAME};
use crate::label::LabelAllocator;

/// Emit the complete assembly module for a program.
///
/// The top-level statements come first and end in an exit syscall; the
/// function bodies follow, so control never falls into one.
pub fn generate(program: &Program, frames: &FrameTable) -> CompileResult<Assembly> {
  let mut codegen = Codegen::new(frames);
  let (main, pending) = codegen.emit_program(program)?;
  let functions = codegen.emit_functions(&pending)?;

  let mut asm = preamble();
  asm.append(main);
  asm.append(functions);
  debug!(
    instructions = asm.len(),
    functions = pending.len(),
    "generated assembly"
  );
  Ok(asm)
}

/// Label a function's body starts at.
pub fn entry_label(name: &str) -> String {
  format!("{name}_entry")
}

fn preamble() -> Assembly {
  let mut asm = Assembly::new();
  asm.push(Instruction::Directive(".data".to_string()));
  asm.push(Instruction::Directive(".text".to_string()));
  asm.push(Instruction::Directive(format!(".globl {MAIN_FRAME}")));
  asm.push(Instruction::Label(MAIN_FRAME.to_string()));
  asm
}

/// The frame an expression is lowered in.
#[derive(Clone, Copy)]
struct Scope<'a> {
  function: Option<&'a FunctionDecl>,
  temp_slots: usize,
}

struct Codegen<'a> {
  frames: &'a FrameTable,
  labels: LabelAllocator,
}

impl<'a> Codegen<'a> {
  fn new(frames: &'a FrameTable) -> Self {
    Self {
      frames,
      labels: LabelAllocator::new(),
    }
  }

  /// First pass: the top-level statements in source order, followed by the
  /// exit sequence. Function declarations are handed back for the second pass.
  fn emit_program<'p>(
    &mut self,
    program: &'p Program,
  ) -> CompileResult<(Assembly, Vec<&'p FunctionDecl>)> {
    let frame = self.frames.program()?;
    let scope = Scope {
      function: None,
      temp_slots: frame.temp_slots,
    };

    let mut asm = Assembly::new();
    let mut pending = Vec::new();
    open_frame(&mut asm, frame);

    for decl in &program.decls {
      match decl {
        Decl::Function(function) => pending.push(function),
        Decl::Expr(stmt) => self.emit_expr(&stmt.expr, scope, 0, &mut asm)?,
      }
    }

    asm.push(Instruction::Li {
      dst: Reg::V0,
      imm: Syscall::Exit as i32,
    });
    asm.push(Instruction::Syscall);
    Ok((asm, pending))
  }

  /// Second pass: one body per deferred declaration.
  fn emit_functions(&mut self, pending: &[&FunctionDecl]) -> CompileResult<Assembly> {
    let mut asm = Assembly::new();
    for function in pending {
      self.emit_function(function, &mut asm)?;
    }
    Ok(asm)
  }

  fn emit_function(&mut self, function: &FunctionDecl, asm: &mut Assembly) -> CompileResult<()> {
    let frame = self.frames.lookup(&function.name)?;
    trace!(function = %function.name, temp_slots = frame.temp_slots, "emitting function body");

    asm.push(Instruction::Label(entry_label(&function.name)));
    open_frame(asm, frame);
    let scope = Scope {
      function: Some(function),
      temp_slots: frame.temp_slots,
    };
    self.emit_expr(&function.body, scope, 0, asm)?;
    close_frame(asm, frame);
    Ok(())
  }

  /// Emit code leaving the value of `node` in the accumulator. `depth` is the
  /// number of temp slots already holding live values.
  fn emit_expr(
    &mut self,
    node: &Expr,
    scope: Scope<'_>,
    depth: usize,
    asm: &mut Assembly,
  ) -> CompileResult<()> {
    match node {
      Expr::Number { value } => asm.push(Instruction::Li {
        dst: Reg::Acc,
        imm: *value,
      }),
      Expr::Variable { name } => {
        let function = scope
          .function
          .context(VariableOutsideFunctionSnafu { name })?;
        let index = function.param_index(name).context(UnknownVariableSnafu {
          name,
          function: &function.name,
        })?;
        asm.push(Instruction::Lw {
          dst: Reg::Acc,
          offset: words(index + 1),
          base: Reg::Fp,
        });
      }
      Expr::Binary { op, lhs, rhs } => {
        self.emit_parked(lhs, rhs, scope, depth, asm)?;
        let instruction = match op {
          BinaryOp::Plus => Instruction::Add {
            dst: Reg::Acc,
            lhs: Reg::Tmp,
            rhs: Reg::Acc,
          },
          // lhs - rhs, with lhs parked in the temp register
          BinaryOp::Minus => Instruction::Sub {
            dst: Reg::Acc,
            lhs: Reg::Tmp,
            rhs: Reg::Acc,
          },
        };
        asm.push(instruction);
      }
      Expr::IfElse {
        cond_lhs,
        cond_rhs,
        then_branch,
        else_branch,
      } => {
        let labels = self.labels.if_labels();
        self.emit_parked(cond_lhs, cond_rhs, scope, depth, asm)?;
        asm.push(Instruction::Beq {
          lhs: Reg::Acc,
          rhs: Reg::Tmp,
          target: labels.true_branch.clone(),
        });
        self.emit_expr(else_branch, scope, depth, asm)?;
        asm.push(Instruction::B(labels.end.clone()));
        asm.push(Instruction::Label(labels.true_branch));
        self.emit_expr(then_branch, scope, depth, asm)?;
        asm.push(Instruction::Label(labels.end));
      }
      Expr::Call { name, args } if name == PRINT => {
        let [arg] = args.as_slice() else {
          return ArgumentCountSnafu {
            name,
            expected: 1usize,
            found: args.len(),
          }
          .fail();
        };
        self.emit_expr(arg, scope, depth, asm)?;
        asm.push(Instruction::Li {
          dst: Reg::V0,
          imm: Syscall::PrintInt as i32,
        });
        asm.push(Instruction::Syscall);
      }
      Expr::Call { name, args } => {
        let frame = self.frames.get(name).context(UnknownFunctionSnafu { name })?;
        ensure!(
          frame.params == args.len(),
          ArgumentCountSnafu {
            name,
            expected: frame.params,
            found: args.len(),
          }
        );

        // the callee restores $fp from this slot on return
        push(asm, Reg::Fp);
        for arg in args.iter().rev() {
          self.emit_expr(arg, scope, depth, asm)?;
          push(asm, Reg::Acc);
        }
        asm.push(Instruction::Jal(entry_label(name)));
      }
    }
    Ok(())
  }

  /// Evaluate `lhs` into temp slot `depth + 1`, then `rhs` into the
  /// accumulator, and reload the parked value into the temp register.
  fn emit_parked(
    &mut self,
    lhs: &Expr,
    rhs: &Expr,
    scope: Scope<'_>,
    depth: usize,
    asm: &mut Assembly,
  ) -> CompileResult<()> {
    let slot = depth + 1;
    debug_assert!(slot <= scope.temp_slots, "temp slot {slot} outside the frame");
    self.emit_expr(lhs, scope, depth, asm)?;
    asm.push(Instruction::Sw {
      src: Reg::Acc,
      offset: temp_offset(slot),
      base: Reg::Fp,
    });
    self.emit_expr(rhs, scope, slot, asm)?;
    asm.push(Instruction::Lw {
      dst: Reg::Tmp,
      offset: temp_offset(slot),
      base: Reg::Fp,
    });
    Ok(())
  }
}

fn words(count: usize) -> i32 {
  WORD_SIZE * count as i32
}

fn temp_offset(slot: usize) -> i32 {
  -words(slot)
}

fn push(asm: &mut Assembly, reg: Reg) {
  asm.push(Instruction::Sw {
    src: reg,
    offset: 0,
    base: Reg::Sp,
  });
  asm.push(Instruction::Addiu {
    dst: Reg::Sp,
    src: Reg::Sp,
    imm: -WORD_SIZE,
  });
}

/// Point `$fp` at the argument block, save `$ra` and reserve the temp slots.
fn open_frame(asm: &mut Assembly, frame: &Frame) {
  asm.push(Instruction::Move {
    dst: Reg::Fp,
    src: Reg::Sp,
  });
  push(asm, Reg::Ra);
  if frame.temp_slots > 0 {
    asm.push(Instruction::Addiu {
      dst: Reg::Sp,
      src: Reg::Sp,
      imm: -words(frame.temp_slots),
    });
  }
}

/// Pop arguments, saved `$fp`, return address and temp slots in one step,
/// then return to the caller.
fn close_frame(asm: &mut Assembly, frame: &Frame) {
  asm.push(Instruction::Lw {
    dst: Reg::Ra,
    offset: 0,
    base: Reg::Fp,
  });
  asm.push(Instruction::Addiu {
    dst: Reg::Sp,
    src: Reg::Sp,
    imm: words(frame.words()),
  });
  asm.push(Instruction::Lw {
    dst: Reg::Fp,
    offset: 0,
    base: Reg::Sp,
  });
  asm.push(Instruction::Jr(Reg::Ra));
}
