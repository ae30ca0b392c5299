//! Register layouts. Each one is generic over a backend that performs the
//! raw register accesses; the `Native` backends are the only code tied to
//! the target architecture.

use core::cell::Cell;

use super::Except;

pub mod aarch64;
pub mod arm;

/// Faults recorded by an emulated backend instead of raising `SIGFPE`.
#[derive(Debug, Default)]
pub struct FaultLog {
    count: Cell<usize>,
    last: Cell<Except>,
}

impl FaultLog {
    pub const fn new() -> Self {
        Self {
            count: Cell::new(0),
            last: Cell::new(Except::empty()),
        }
    }

    pub fn record(&self, excepts: Except) {
        log::debug!("emulated fault for {:#x}", excepts.bits());
        self.count.set(self.count.get() + 1);
        self.last.set(excepts);
    }

    /// Number of faults delivered so far.
    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Exceptions named by the most recent fault.
    pub fn last(&self) -> Except {
        self.last.get()
    }
}
