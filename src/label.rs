//! Unique label minting for control-flow targets.

/// Branch targets for one `if`/`else` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfLabels {
  pub true_branch: String,
  pub end: String,
}

/// Monotonic counter owned by one compilation, so separate runs never share
/// state.
#[derive(Debug, Default)]
pub struct LabelAllocator {
  next: usize,
}

impl LabelAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Both targets of an `if` share one counter value.
  pub fn if_labels(&mut self) -> IfLabels {
    let id = self.next;
    self.next += 1;
    IfLabels {
      true_branch: format!("true_branch_{id}"),
      end: format!("end_if_{id}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_never_repeat() {
    let mut labels = LabelAllocator::new();
    let first = labels.if_labels();
    let second = labels.if_labels();

    assert_eq!(first.true_branch, "true_branch_0");
    assert_eq!(first.end, "end_if_0");
    assert_eq!(second.true_branch, "true_branch_1");
    assert_ne!(first.end, second.end);
  }

  #[test]
  fn allocators_are_independent() {
    let mut a = LabelAllocator::new();
    let mut b = LabelAllocator::new();
    a.if_labels();
    assert_eq!(b.if_labels().true_branch, "true_branch_0");
  }
}
