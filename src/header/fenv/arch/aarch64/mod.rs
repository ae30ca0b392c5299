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
//! Copyright (c) 2004 David Schultz <das@FreeBSD.ORG>
//! All rights reserved.
//!
//! Redistribution and use in source and binary forms, with or without
//! modification, are permitted provided that the following conditions
//! are met:
//! 1. Redistributions of source code must retain the above copyright
//!    notice, this list of conditions and the following disclaimer.
//! 2. Redistributions in binary form must reproduce the above copyright
//!    notice, this list of conditions and the following disclaimer in the
//!    documentation and/or other materials provided with the distribution.
//!
//! THIS SOFTWARE IS PROVIDED BY THE AUTHOR AND CONTRIBUTORS ``AS IS'' AND
//! ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
//! IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
//! ARE DISCLAIMED.  IN NO EVENT SHALL THE AUTHOR OR CONTRIBUTORS BE LIABLE
//! FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
//! DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS
//! OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION)
//! HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT
//! LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY
//! OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF
//! SUCH DAMAGE.
//!
//! $FreeBSD: libm/aarch64/fenv.c $
//!
//! AArch64: control in FPCR, sticky flags in FPSR.
//!
//! FPCR holds RMode at bits 22-23 and the IOE, DZE, OFE, UFE, IXE trap
//! enables at bits 8-12. FPSR holds IOC, DZC, OFC, UFC, IXC at bits 0-4.
//! FPCR is only written when its value changes.

use core::cell::Cell;

#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
use core::arch::asm;

use super::FaultLog;
use crate::{
    error::FenvError,
    header::fenv::{Except, FloatEnv, Round},
    platform,
};

const FPCR_EXCEPT_SHIFT: u32 = 8;
const FPCR_RMODE_SHIFT: u32 = 22;
const FPCR_RMODE_MASK: u32 = 0x3 << FPCR_RMODE_SHIFT;

const SUPPORTED: Except = Except::ALL_EXCEPT;
const FPSR_FLAG_MASK: u32 = SUPPORTED.bits();
const FPCR_EXCEPT_MASK: u32 = SUPPORTED.bits() << FPCR_EXCEPT_SHIFT;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct fenv_t {
    /// FPCR
    pub __control: u32,
    /// FPSR
    pub __status: u32,
}

pub const FE_DFL_ENV: fenv_t = fenv_t {
    __control: 0,
    __status: 0,
};

/// Raw FPCR / FPSR access.
pub trait Fpu {
    fn read_fpcr(&self) -> u32;

    fn write_fpcr(&self, fpcr: u32);

    fn read_fpsr(&self) -> u32;

    fn write_fpsr(&self, fpsr: u32);

    fn deliver_fault(&self, excepts: Except) {
        platform::deliver_fpe(excepts);
    }
}

impl<B: Fpu + ?Sized> Fpu for &B {
    fn read_fpcr(&self) -> u32 {
        (**self).read_fpcr()
    }

    fn write_fpcr(&self, fpcr: u32) {
        (**self).write_fpcr(fpcr)
    }

    fn read_fpsr(&self) -> u32 {
        (**self).read_fpsr()
    }

    fn write_fpsr(&self, fpsr: u32) {
        (**self).write_fpsr(fpsr)
    }

    fn deliver_fault(&self, excepts: Except) {
        (**self).deliver_fault(excepts)
    }
}

fn flags(fpsr: u32) -> Except {
    Except::from_bits_truncate(fpsr & FPSR_FLAG_MASK)
}

fn enables(fpcr: u32) -> Except {
    Except::from_bits_truncate((fpcr & FPCR_EXCEPT_MASK) >> FPCR_EXCEPT_SHIFT)
}

/// Floating-point environment over an FPCR / FPSR backend.
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

impl<B: Fpu> Fenv<B> {
    fn set_fpcr(&self, old: u32, new: u32) {
        if new != old {
            self.backend.write_fpcr(new);
        }
    }

    fn swap_enables(&self, old: u32, new: u32, requested: Except) -> Result<Except, FenvError> {
        self.set_fpcr(old, new);
        let check = self.backend.read_fpcr();
        if check != new {
            log::warn!("FPCR kept {:#010x} instead of {:#010x}", check, new);
            return Err(FenvError::Unsupported {
                requested,
                retained: enables(check),
            });
        }
        Ok(enables(old))
    }
}

impl<B: Fpu> FloatEnv for Fenv<B> {
    type Env = fenv_t;

    const SUPPORTED: Except = SUPPORTED;

    fn get_env(&self) -> fenv_t {
        fenv_t {
            __control: self.backend.read_fpcr(),
            __status: self.backend.read_fpsr(),
        }
    }

    fn set_env(&self, env: &fenv_t) {
        self.set_fpcr(self.backend.read_fpcr(), env.__control);
        self.backend.write_fpsr(env.__status);
    }

    fn clear_except(&self, excepts: Except) {
        let fpsr = self.backend.read_fpsr();
        self.backend.write_fpsr(fpsr & !(excepts & SUPPORTED).bits());
    }

    fn get_except_flag(&self, excepts: Except) -> Except {
        flags(self.backend.read_fpsr()) & excepts
    }

    fn set_except_flag(&self, flags: Except, excepts: Except) {
        let excepts = excepts & SUPPORTED;
        let mut fpsr = self.backend.read_fpsr();
        fpsr &= !excepts.bits();
        fpsr |= (flags & excepts).bits();
        self.backend.write_fpsr(fpsr);
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
        Round::from_field(self.backend.read_fpcr() >> FPCR_RMODE_SHIFT)
    }

    fn set_round(&self, round: Round) {
        let fpcr = self.backend.read_fpcr();
        let new = (fpcr & !FPCR_RMODE_MASK) | (round.field() << FPCR_RMODE_SHIFT);
        self.set_fpcr(fpcr, new);
    }

    fn hold_except(&self) -> fenv_t {
        let env = self.get_env();

        // Untrap everything, then clear the flags.
        self.set_fpcr(env.__control, env.__control & !FPCR_EXCEPT_MASK);
        self.backend.write_fpsr(env.__status & !FPSR_FLAG_MASK);
        env
    }

    fn update_env(&self, env: &fenv_t) {
        let raised = flags(self.backend.read_fpsr());
        self.set_env(env);
        self.raise_except(flags(env.__status) | raised);
    }

    fn enable_except(&self, excepts: Except) -> Result<Except, FenvError> {
        let old = self.backend.read_fpcr();
        let new = old | ((excepts & SUPPORTED).bits() << FPCR_EXCEPT_SHIFT);
        self.swap_enables(old, new, excepts)
    }

    fn disable_except(&self, excepts: Except) -> Result<Except, FenvError> {
        let old = self.backend.read_fpcr();
        let new = old & !((excepts & SUPPORTED).bits() << FPCR_EXCEPT_SHIFT);
        self.swap_enables(old, new, excepts)
    }

    fn get_except(&self) -> Except {
        enables(self.backend.read_fpcr())
    }
}

/// The executing core's FPCR and FPSR.
#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
impl Fpu for Native {
    #[inline(always)]
    fn read_fpcr(&self) -> u32 {
        let fpcr: u64;
        unsafe {
            asm!("mrs {0}, fpcr", out(reg) fpcr, options(nostack, preserves_flags));
        }
        fpcr as u32
    }

    #[inline(always)]
    fn write_fpcr(&self, fpcr: u32) {
        unsafe {
            asm!("msr fpcr, {0}", in(reg) fpcr as u64, options(nostack, preserves_flags));
        }
    }

    #[inline(always)]
    fn read_fpsr(&self) -> u32 {
        let fpsr: u64;
        unsafe {
            asm!("mrs {0}, fpsr", out(reg) fpsr, options(nostack, preserves_flags));
        }
        fpsr as u32
    }

    #[inline(always)]
    fn write_fpsr(&self, fpsr: u32) {
        unsafe {
            asm!("msr fpsr, {0}", in(reg) fpsr as u64, options(nostack, preserves_flags));
        }
    }
}

#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
pub const fn native() -> Fenv<Native> {
    Fenv::new(Native)
}

/// FPCR and FPSR held in memory, for hosts and tests.
///
/// FPCR bits outside `implemented` read as zero and ignore writes. Most
/// AArch64 cores treat the trap enables that way.
#[derive(Debug)]
pub struct EmulatedFpu {
    fpcr: Cell<u32>,
    fpsr: Cell<u32>,
    implemented: u32,
    fpcr_writes: Cell<usize>,
    faults: FaultLog,
}

impl EmulatedFpu {
    pub const fn new() -> Self {
        Self::with_implemented(!0)
    }

    pub const fn without_traps() -> Self {
        Self::with_implemented(!FPCR_EXCEPT_MASK)
    }

    pub const fn with_implemented(implemented: u32) -> Self {
        Self {
            fpcr: Cell::new(0),
            fpsr: Cell::new(0),
            implemented,
            fpcr_writes: Cell::new(0),
            faults: FaultLog::new(),
        }
    }

    pub fn fpcr(&self) -> u32 {
        self.fpcr.get()
    }

    pub fn fpsr(&self) -> u32 {
        self.fpsr.get()
    }

    /// Loads both registers without counting an FPCR write.
    pub fn preset(&self, fpcr: u32, fpsr: u32) {
        self.fpcr.set(fpcr & self.implemented);
        self.fpsr.set(fpsr);
    }

    pub fn fpcr_writes(&self) -> usize {
        self.fpcr_writes.get()
    }

    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }
}

impl Default for EmulatedFpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Fpu for EmulatedFpu {
    fn read_fpcr(&self) -> u32 {
        self.fpcr.get()
    }

    fn write_fpcr(&self, fpcr: u32) {
        self.fpcr_writes.set(self.fpcr_writes.get() + 1);
        self.fpcr.set(fpcr & self.implemented);
    }

    fn read_fpsr(&self) -> u32 {
        self.fpsr.get()
    }

    fn write_fpsr(&self, fpsr: u32) {
        self.fpsr.set(fpsr);
    }

    fn deliver_fault(&self, excepts: Except) {
        self.faults.record(excepts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_and_status_are_split() {
        let fpu = EmulatedFpu::new();
        let fenv = Fenv::new(&fpu);

        fenv.set_round(Round::Upward);
        fenv.enable_except(Except::INVALID).unwrap();
        fenv.raise_except(Except::UNDERFLOW);

        assert_eq!(fpu.fpcr(), 0x0040_0100);
        assert_eq!(fpu.fpsr(), 0x08);
        assert_eq!(
            fenv.get_env(),
            fenv_t {
                __control: 0x0040_0100,
                __status: 0x08,
            }
        );
    }

    #[test]
    fn set_env_skips_identical_fpcr() {
        let fpu = EmulatedFpu::new();
        let fenv = Fenv::new(&fpu);
        fpu.preset(0x0080_0000, 0);

        fenv.set_env(&fenv_t {
            __control: 0x0080_0000,
            __status: 0x05,
        });
        assert_eq!(fpu.fpcr_writes(), 0);
        assert_eq!(fpu.fpsr(), 0x05);

        fenv.set_env(&FE_DFL_ENV);
        assert_eq!(fpu.fpcr_writes(), 1);
        assert_eq!(fenv.get_env(), FE_DFL_ENV);
    }

    #[test]
    fn denormal_is_not_supported() {
        let fpu = EmulatedFpu::new();
        let fenv = Fenv::new(&fpu);

        fenv.raise_except(Except::DENORMAL);
        assert_eq!(fpu.fpsr(), 0);
        assert_eq!(fenv.enable_except(Except::DENORMAL), Ok(Except::empty()));
        assert_eq!(fpu.fpcr(), 0);
    }

    #[test]
    fn hold_keeps_unrelated_status_bits() {
        let fpu = EmulatedFpu::new();
        let fenv = Fenv::new(&fpu);
        // QC (bit 27) is not an exception flag
        fpu.preset(0x00c0_1f00, 0x0800_001f);

        let env = fenv.hold_except();
        assert_eq!(
            env,
            fenv_t {
                __control: 0x00c0_1f00,
                __status: 0x0800_001f,
            }
        );
        assert_eq!(fpu.fpcr(), 0x00c0_0000);
        assert_eq!(fpu.fpsr(), 0x0800_0000);
    }

    #[test]
    fn raz_wi_enables_report_sentinel() {
        let fpu = EmulatedFpu::without_traps();
        let fenv = Fenv::new(&fpu);

        assert_eq!(
            fenv.enable_except(Except::ALL_EXCEPT),
            Err(FenvError::Unsupported {
                requested: Except::ALL_EXCEPT,
                retained: Except::empty(),
            })
        );
        assert!(fenv.get_except().is_empty());

        // Flags still work without traps, and nothing faults.
        fenv.raise_except(Except::OVERFLOW);
        assert_eq!(fenv.test_except(Except::OVERFLOW), Except::OVERFLOW);
        assert_eq!(fpu.faults().count(), 0);
    }

    #[test]
    fn enable_without_change_does_not_write() {
        let fpu = EmulatedFpu::new();
        let fenv = Fenv::new(&fpu);
        fpu.preset(0x0000_0400, 0);

        assert_eq!(fenv.enable_except(Except::OVERFLOW), Ok(Except::OVERFLOW));
        assert_eq!(fpu.fpcr_writes(), 0);
    }
}
