use std::cell::Cell;
use std::rc::Rc;

/// Monotonic counter bumped on every chapter change.
///
/// Async work captures an [`EpochGuard`] before its first suspension point
/// and checks it on completion; a guard from an older chapter turns the
/// completion into a no-op, the same job an abort controller does for fetch.
#[derive(Clone, Debug, Default)]
pub struct ChapterEpoch {
    current: Rc<Cell<u64>>,
}

impl ChapterEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> EpochGuard {
        self.current.set(self.current.get().wrapping_add(1));
        self.guard()
    }

    pub fn guard(&self) -> EpochGuard {
        EpochGuard {
            current: self.current.clone(),
            captured: self.current.get(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EpochGuard {
    current: Rc<Cell<u64>>,
    captured: u64,
}

impl EpochGuard {
    pub fn is_current(&self) -> bool {
        self.current.get() == self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_goes_stale_after_advance() {
        let epoch = ChapterEpoch::new();
        let first = epoch.guard();
        assert!(first.is_current());

        let second = epoch.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
    }
}
