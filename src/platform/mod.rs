use core::fmt;

use spin::RwLock;

use crate::header::{fenv::Except, signal::SIGFPE};

pub use self::sys::{e, Sys};

#[cfg(any(target_os = "linux", target_os = "android"))]
#[path = "linux/mod.rs"]
mod sys;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[path = "unsupported/mod.rs"]
mod sys;

pub mod logger;

use self::types::*;
pub mod types;

/// Hook invoked in place of `SIGFPE` when a trap-enabled exception is raised.
pub type FaultHandler = fn(Except);

static FAULT_HANDLER: RwLock<Option<FaultHandler>> = RwLock::new(None);

/// Registers `handler` as the floating-point fault hook, returning the
/// previous one. `None` restores signal delivery.
pub fn set_fault_handler(handler: Option<FaultHandler>) -> Option<FaultHandler> {
    core::mem::replace(&mut *FAULT_HANDLER.write(), handler)
}

pub fn fault_handler() -> Option<FaultHandler> {
    *FAULT_HANDLER.read()
}

/// Delivers a floating-point fault for `excepts` on the calling thread.
///
/// This runs synchronously: either the registered hook, or a `SIGFPE`
/// directed at the calling thread (`tkill`). Either of them may not return.
pub fn deliver_fpe(excepts: Except) {
    match fault_handler() {
        Some(handler) => {
            log::debug!("fault hook for {:#x}", excepts.bits());
            handler(excepts);
        }
        None => {
            log::debug!("raising SIGFPE for {:#x}", excepts.bits());
            if Sys::raise(SIGFPE) < 0 {
                log::error!("failed to deliver SIGFPE");
            }
        }
    }
}

pub struct FileWriter(pub c_int);

impl FileWriter {
    pub const fn new(fd: c_int) -> Self {
        Self(fd)
    }

    pub fn write(&mut self, buf: &[u8]) -> isize {
        Sys::write(self.0, buf)
    }
}

impl fmt::Write for FileWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    static SEEN: AtomicU32 = AtomicU32::new(0);

    fn record(excepts: Except) {
        SEEN.fetch_or(excepts.bits(), Ordering::SeqCst);
    }

    #[test]
    fn fault_hook_replaces_signal() {
        assert!(set_fault_handler(Some(record)).is_none());
        deliver_fpe(Except::OVERFLOW | Except::INEXACT);
        assert_eq!(SEEN.load(Ordering::SeqCst), 0x14);

        let previous = set_fault_handler(None);
        assert!(previous.is_some());
        assert!(fault_handler().is_none());
    }
}
