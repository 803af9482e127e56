//! Typed MIPS instructions and their SPIM text rendering.

use std::fmt;

/// Size of one stack slot in bytes.
pub const WORD_SIZE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
  /// Accumulator: every expression leaves its value here.
  Acc,
  /// Holds a parked left operand while the right one is in `Acc`.
  Tmp,
  Sp,
  Fp,
  Ra,
  /// Syscall selector.
  V0,
}

impl fmt::Display for Reg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Reg::Acc => "$a0",
      Reg::Tmp => "$t1",
      Reg::Sp => "$sp",
      Reg::Fp => "$fp",
      Reg::Ra => "$ra",
      Reg::V0 => "$v0",
    };
    f.write_str(name)
  }
}

/// SPIM syscall codes, loaded into `$v0` before `syscall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
  PrintInt = 1,
  Exit = 10,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
  Directive(String),
  Label(String),
  Li { dst: Reg, imm: i32 },
  Sw { src: Reg, offset: i32, base: Reg },
  Lw { dst: Reg, offset: i32, base: Reg },
  Add { dst: Reg, lhs: Reg, rhs: Reg },
  Sub { dst: Reg, lhs: Reg, rhs: Reg },
  Addiu { dst: Reg, src: Reg, imm: i32 },
  Move { dst: Reg, src: Reg },
  B(String),
  Beq { lhs: Reg, rhs: Reg, target: String },
  Jal(String),
  Jr(Reg),
  Syscall,
}

impl Instruction {
  fn is_flush_left(&self) -> bool {
    matches!(self, Instruction::Directive(_) | Instruction::Label(_))
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Instruction::Directive(directive) => write!(f, "{directive}"),
      Instruction::Label(label) => write!(f, "{label}:"),
      Instruction::Li { dst, imm } => write!(f, "li {dst} {imm}"),
      Instruction::Sw { src, offset, base } => write!(f, "sw {src} {offset}({base})"),
      Instruction::Lw { dst, offset, base } => write!(f, "lw {dst} {offset}({base})"),
      Instruction::Add { dst, lhs, rhs } => write!(f, "add {dst} {lhs} {rhs}"),
      Instruction::Sub { dst, lhs, rhs } => write!(f, "sub {dst} {lhs} {rhs}"),
      Instruction::Addiu { dst, src, imm } => write!(f, "addiu {dst} {src} {imm}"),
      Instruction::Move { dst, src } => write!(f, "move {dst} {src}"),
      Instruction::B(label) => write!(f, "b {label}"),
      Instruction::Beq { lhs, rhs, target } => write!(f, "beq {lhs} {rhs} {target}"),
      Instruction::Jal(label) => write!(f, "jal {label}"),
      Instruction::Jr(reg) => write!(f, "jr {reg}"),
      Instruction::Syscall => write!(f, "syscall"),
    }
  }
}

/// An ordered list of instructions forming one assembly module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
  instructions: Vec<Instruction>,
}

impl Assembly {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, instruction: Instruction) {
    self.instructions.push(instruction);
  }

  pub fn append(&mut self, mut other: Assembly) {
    self.instructions.append(&mut other.instructions);
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  /// Text lines as they appear in the output file. Labels and directives sit
  /// flush left, everything else is indented.
  pub fn lines(&self) -> Vec<String> {
    self
      .instructions
      .iter()
      .map(|instruction| {
        if instruction.is_flush_left() {
          instruction.to_string()
        } else {
          format!("    {instruction}")
        }
      })
      .collect()
  }
}

impl fmt::Display for Assembly {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in self.lines() {
      writeln!(f, "{line}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn instructions_render_in_spim_syntax() {
    let cases = [
      (Instruction::Li { dst: Reg::Acc, imm: -3 }, "li $a0 -3"),
      (
        Instruction::Sw {
          src: Reg::Acc,
          offset: -8,
          base: Reg::Fp,
        },
        "sw $a0 -8($fp)",
      ),
      (
        Instruction::Lw {
          dst: Reg::Tmp,
          offset: 4,
          base: Reg::Sp,
        },
        "lw $t1 4($sp)",
      ),
      (
        Instruction::Sub {
          dst: Reg::Acc,
          lhs: Reg::Tmp,
          rhs: Reg::Acc,
        },
        "sub $a0 $t1 $a0",
      ),
      (
        Instruction::Addiu {
          dst: Reg::Sp,
          src: Reg::Sp,
          imm: -4,
        },
        "addiu $sp $sp -4",
      ),
      (
        Instruction::Beq {
          lhs: Reg::Acc,
          rhs: Reg::Tmp,
          target: "true_branch_0".to_string(),
        },
        "beq $a0 $t1 true_branch_0",
      ),
      (Instruction::Jal("f_entry".to_string()), "jal f_entry"),
      (Instruction::Jr(Reg::Ra), "jr $ra"),
    ];
    for (instruction, text) in cases {
      assert_eq!(instruction.to_string(), text);
    }
  }

  #[test]
  fn labels_and_directives_are_flush_left() {
    let mut asm = Assembly::new();
    asm.push(Instruction::Directive(".text".to_string()));
    asm.push(Instruction::Label("main".to_string()));
    asm.push(Instruction::Syscall);
    assert_eq!(asm.lines(), vec![".text", "main:", "    syscall"]);
    assert_eq!(asm.to_string(), ".text\nmain:\n    syscall\n");
  }

  #[test]
  fn append_keeps_order() {
    let mut first = Assembly::new();
    first.push(Instruction::Label("a".to_string()));
    let mut second = Assembly::new();
    second.push(Instruction::Label("b".to_string()));
    first.append(second);
    assert_eq!(first.lines(), vec!["a:", "b:"]);
    assert_eq!(first.len(), 2);
  }
}
