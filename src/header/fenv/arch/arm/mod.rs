//! Copyright (c) 2011-2015 CrystaX.
//! All rights reserved.
//!
//! Redistribution and use in source and binary forms, with or without modification, are
//! permitted provided that the following conditions are met:
//!
//!    1. Redistributions of source code must retain the above copyright notice, this list of
//!       conditions and the following disclaimer.
//!
//!    2. Redistributions in binary form must reproduce the above copyright notice, this list
//!       of conditions and the following disclaimer in the documentation and/or other materials
//!       provided with the distribution.
//!
//! THIS SOFTWARE IS PROVIDED BY CrystaX ''AS IS'' AND ANY EXPRESS OR IMPLIED
//! WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
//! FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL CrystaX OR
//! CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
//! CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
//! SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON
//! ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
//! NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF
//! ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.
//!
//! The views and conclusions contained in the software and documentation are those of the
//! authors and should not be interpreted as representing official policies, either expressed
//! or implied, of CrystaX.
//!
//! 32-bit ARM VFP: rounding mode, trap enables and sticky flags all live in
//! the single FPSCR word.
//!
//! | Bits  | Field                                   |
//! |-------|-----------------------------------------|
//! | 22-23 | RMode                                   |
//! | 15    | IDE (input denormal trap enable)        |
//! | 8-12  | IOE, DZE, OFE, UFE, IXE (trap enables)  |
//! | 7     | IDC (input denormal flag)               |
//! | 0-4   | IOC, DZC, OFC, UFC, IXC (sticky flags)  |

use core::cell::Cell;

#[cfg(all(
    target_arch = "arm",
    any(target_os = "linux", target_os = "android")
))]
use core::arch::asm;

use super::FaultLog;
use crate::{
    error::FenvError,
    header::fenv::{Except, FloatEnv, Round},
    platform,
};

const FPSCR_ENABLE_SHIFT: u32 = 8;
const FPSCR_RMODE_SHIFT: u32 = 22;
const FPSCR_RMODE_MASK: u32 = 0x3 << FPSCR_RMODE_SHIFT;

const SUPPORTED: Except = Except::all();
const FPSCR_FLAG_MASK: u32 = SUPPORTED.bits();
const FPSCR_ENABLE_MASK: u32 = SUPPORTED.bits() << FPSCR_ENABLE_SHIFT;

/// The FPSCR image.
pub type fenv_t = u32;

/// Round to nearest, no traps, no flags.
pub const FE_DFL_ENV: fenv_t = 0;

/// Raw FPSCR access.
pub trait Vfp {
    fn read_fpscr(&self) -> u32;

    fn write_fpscr(&self, fpscr: u32);

    fn deliver_fault(&self, excepts: Except) {
        platform::deliver_fpe(excepts);
    }
}

impl<B: Vfp + ?Sized> Vfp for &B {
    fn read_fpscr(&self) -> u32 {
        (**self).read_fpscr()
    }

    fn write_fpscr(&self, fpscr: u32) {
        (**self).write_fpscr(fpscr)
    }

    fn deliver_fault(&self, excepts: Except) {
        (**self).deliver_fault(excepts)
    }
}

fn flags(fpscr: u32) -> Except {
    Except::from_bits_truncate(fpscr & FPSCR_FLAG_MASK)
}

fn enables(fpscr: u32) -> Except {
    Except::from_bits_truncate((fpscr & FPSCR_ENABLE_MASK) >> FPSCR_ENABLE_SHIFT)
}

/// Floating-point environment over an FPSCR backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fenv<B> {
    backend: B,
}

impl<B> Fenv<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Vfp> Fenv<B> {
    /// Writes `new` and checks that the core kept it. Returns the enables of `old`.
    fn swap_enables(&self, old: u32, new: u32, requested: Except) -> Result<Except, FenvError> {
        if new != old {
            self.backend.write_fpscr(new);
        }
        let check = self.backend.read_fpscr();
        if check != new {
            log::warn!(
                "FPSCR kept {:#010x} instead of {:#010x}",
                check,
                new
            );
            return Err(FenvError::Unsupported {
                requested,
                retained: enables(check),
            });
        }
        Ok(enables(old))
    }
}

impl<B: Vfp> FloatEnv for Fenv<B> {
    type Env = fenv_t;

    const SUPPORTED: Except = SUPPORTED;

    fn get_env(&self) -> fenv_t {
        self.backend.read_fpscr()
    }

    fn set_env(&self, env: &fenv_t) {
        self.backend.write_fpscr(*env);
    }

    fn clear_except(&self, excepts: Except) {
        let fpscr = self.backend.read_fpscr();
        self.backend
            .write_fpscr(fpscr & !(excepts & SUPPORTED).bits());
    }

    fn get_except_flag(&self, excepts: Except) -> Except {
        flags(self.backend.read_fpscr()) & excepts
    }

    fn set_except_flag(&self, flags: Except, excepts: Except) {
        let excepts = excepts & SUPPORTED;
        let mut fpscr = self.backend.read_fpscr();
        fpscr &= !excepts.bits();
        fpscr |= (flags & excepts).bits();
        self.backend.write_fpscr(fpscr);
    }

    fn raise_except(&self, excepts: Except) {
        let excepts = excepts & SUPPORTED;
        self.set_except_flag(excepts, excepts);

        let trapped = self.get_except() & excepts;
        if !trapped.is_empty() {
            self.backend.deliver_fault(trapped);
        }
    }

    fn get_round(&self) -> Round {
        Round::from_field(self.backend.read_fpscr() >> FPSCR_RMODE_SHIFT)
    }

    fn set_round(&self, round: Round) {
        let fpscr = self.backend.read_fpscr();
        let new = (fpscr & !FPSCR_RMODE_MASK) | (round.field() << FPSCR_RMODE_SHIFT);
        if new != fpscr {
            self.backend.write_fpscr(new);
        }
    }

    fn hold_except(&self) -> fenv_t {
        let env = self.backend.read_fpscr();
        self.backend
            .write_fpscr(env & !(FPSCR_FLAG_MASK | FPSCR_ENABLE_MASK));
        env
    }

    fn update_env(&self, env: &fenv_t) {
        let raised = flags(self.backend.read_fpscr());
        self.set_env(env);
        self.raise_except(flags(*env) | raised);
    }

    fn enable_except(&self, excepts: Except) -> Result<Except, FenvError> {
        let old = self.backend.read_fpscr();
        let new = old | ((excepts & SUPPORTED).bits() << FPSCR_ENABLE_SHIFT);
        self.swap_enables(old, new, excepts)
    }

    fn disable_except(&self, excepts: Except) -> Result<Except, FenvError> {
        let old = self.backend.read_fpscr();
        let new = old & !((excepts & SUPPORTED).bits() << FPSCR_ENABLE_SHIFT);
        self.swap_enables(old, new, excepts)
    }

    fn get_except(&self) -> Except {
        enables(self.backend.read_fpscr())
    }
}

/// The executing core's VFP.
#[cfg(all(
    target_arch = "arm",
    any(target_os = "linux", target_os = "android")
))]
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

#[cfg(all(
    target_arch = "arm",
    any(target_os = "linux", target_os = "android")
))]
impl Vfp for Native {
    #[inline(always)]
    fn read_fpscr(&self) -> u32 {
        let fpscr: u32;
        unsafe {
            asm!("vmrs {0}, fpscr", out(reg) fpscr, options(nostack, preserves_flags));
        }
        fpscr
    }

    #[inline(always)]
    fn write_fpscr(&self, fpscr: u32) {
        unsafe {
            asm!("vmsr fpscr, {0}", in(reg) fpscr, options(nostack, preserves_flags));
        }
    }
}

#[cfg(all(
    target_arch = "arm",
    any(target_os = "linux", target_os = "android")
))]
pub const fn native() -> Fenv<Native> {
    Fenv::new(Native)
}

/// An FPSCR held in memory, for hosts and tests.
///
/// Bits outside `implemented` read as zero and ignore writes, which is how
/// cores without trapping support treat the trap enables.
#[derive(Debug)]
pub struct EmulatedVfp {
    fpscr: Cell<u32>,
    implemented: u32,
    writes: Cell<usize>,
    faults: FaultLog,
}

impl EmulatedVfp {
    /// A VFP implementing every FPSCR bit, trap enables included.
    pub const fn new() -> Self {
        Self::with_implemented(!0)
    }

    /// A VFP whose trap enables are read-as-zero / write-ignored.
    pub const fn without_traps() -> Self {
        Self::with_implemented(!FPSCR_ENABLE_MASK)
    }

    pub const fn with_implemented(implemented: u32) -> Self {
        Self {
            fpscr: Cell::new(0),
            implemented,
            writes: Cell::new(0),
            faults: FaultLog::new(),
        }
    }

    pub fn fpscr(&self) -> u32 {
        self.fpscr.get()
    }

    /// Loads a register value without counting it as a write.
    pub fn preset(&self, fpscr: u32) {
        self.fpscr.set(fpscr & self.implemented);
    }

    /// Number of FPSCR writes performed through the backend.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }
}

impl Default for EmulatedVfp {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfp for EmulatedVfp {
    fn read_fpscr(&self) -> u32 {
        self.fpscr.get()
    }

    fn write_fpscr(&self, fpscr: u32) {
        self.writes.set(self.writes.get() + 1);
        self.fpscr.set(fpscr & self.implemented);
    }

    fn deliver_fault(&self, excepts: Except) {
        self.faults.record(excepts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_offsets() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);

        fenv.set_round(Round::TowardZero);
        assert_eq!(vfp.fpscr(), 0x00c0_0000);

        fenv.enable_except(Except::OVERFLOW).unwrap();
        assert_eq!(vfp.fpscr(), 0x00c0_0400);

        fenv.set_except_flag(Except::INEXACT, Except::INEXACT);
        assert_eq!(vfp.fpscr(), 0x00c0_0410);
    }

    #[test]
    fn round_leaves_other_control_bits() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);

        // FZ, DN, AHP, a trap enable and two flags set
        let unrelated = 0x0700_0000 | 0x0000_0200 | 0x0000_0011;
        for prior in [Round::ToNearest, Round::Upward, Round::Downward] {
            vfp.preset(unrelated | (prior.field() << FPSCR_RMODE_SHIFT));
            fenv.set_round(Round::TowardZero);
            assert_eq!(fenv.get_round(), Round::TowardZero);
            assert_eq!(vfp.fpscr() & !FPSCR_RMODE_MASK, unrelated);
        }
    }

    #[test]
    fn set_round_skips_redundant_write() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);

        fenv.set_round(Round::Downward);
        assert_eq!(vfp.writes(), 1);
        fenv.set_round(Round::Downward);
        assert_eq!(vfp.writes(), 1);
    }

    #[test]
    fn stray_bits_never_reach_control() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);
        vfp.preset(0x00c0_0000);

        fenv.clear_except(Except::from_bits_retain(0x00c0_0000));
        assert_eq!(fenv.get_round(), Round::TowardZero);

        fenv.raise_except(Except::from_bits_retain(0x0040_0000));
        assert_eq!(vfp.fpscr(), 0x00c0_0000);
    }

    #[test]
    fn denormal_is_reported() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);

        fenv.raise_except(Except::DENORMAL);
        assert_eq!(vfp.fpscr(), 0x80);
        assert_eq!(fenv.test_except(Except::all()), Except::DENORMAL);
        assert!(fenv.test_except(Except::ALL_EXCEPT).is_empty());

        assert_eq!(fenv.enable_except(Except::DENORMAL), Ok(Except::empty()));
        assert_eq!(vfp.fpscr() & 0x8000, 0x8000);
    }

    #[test]
    fn hold_clears_flags_and_enables_only() {
        let vfp = EmulatedVfp::new();
        let fenv = Fenv::new(&vfp);
        let before = 0x0080_0000 | 0x0000_9f00 | 0x0000_009f;
        vfp.preset(before);

        assert_eq!(fenv.hold_except(), before);
        assert_eq!(vfp.fpscr(), 0x0080_0000);
    }

    #[test]
    fn raz_wi_enables_report_sentinel() {
        let vfp = EmulatedVfp::without_traps();
        let fenv = Fenv::new(&vfp);

        let err = fenv.enable_except(Except::DIVBYZERO).unwrap_err();
        assert_eq!(
            err,
            FenvError::Unsupported {
                requested: Except::DIVBYZERO,
                retained: Except::empty(),
            }
        );
        assert!(fenv.get_except().is_empty());

        // Nothing to clear, so nothing to fail.
        assert_eq!(fenv.disable_except(Except::DIVBYZERO), Ok(Except::empty()));
    }

    #[test]
    fn partial_enables_keep_what_the_core_took() {
        // Only IOE and DZE implemented.
        let vfp = EmulatedVfp::with_implemented(!FPSCR_ENABLE_MASK | 0x300);
        let fenv = Fenv::new(&vfp);

        let err = fenv
            .enable_except(Except::INVALID | Except::DIVBYZERO | Except::OVERFLOW)
            .unwrap_err();
        assert_eq!(
            err,
            FenvError::Unsupported {
                requested: Except::INVALID | Except::DIVBYZERO | Except::OVERFLOW,
                retained: Except::INVALID | Except::DIVBYZERO,
            }
        );
        assert_eq!(fenv.get_except(), Except::INVALID | Except::DIVBYZERO);
    }
}
