//! `fenv.h` implementation for ARM and AArch64, following
//! <https://pubs.opengroup.org/onlinepubs/9799919799/basedefs/fenv.h.html>.
//!
//! Both register layouts live in [`arch`] and are compiled on every host.
//! Only the native register backends, and the C symbols built on them, are
//! tied to the target: ARM or AArch64 running Linux or Android.

use bitflags::bitflags;

use crate::{error::FenvError, platform::types::*};

pub mod arch;

#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    any(target_os = "linux", target_os = "android")
))]
mod abi;
#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    any(target_os = "linux", target_os = "android")
))]
pub use self::abi::*;


pub const FE_INVALID: c_int = 0x01;
pub const FE_DIVBYZERO: c_int = 0x02;
pub const FE_OVERFLOW: c_int = 0x04;
pub const FE_UNDERFLOW: c_int = 0x08;
pub const FE_INEXACT: c_int = 0x10;
/// Input denormal. Only the 32-bit VFP layout reports it.
pub const FE_DENORMAL: c_int = 0x80;

pub const FE_ALL_EXCEPT: c_int =
    FE_INVALID | FE_DIVBYZERO | FE_OVERFLOW | FE_UNDERFLOW | FE_INEXACT;

pub const FE_TONEAREST: c_int = 0x0;
pub const FE_UPWARD: c_int = 0x1;
pub const FE_DOWNWARD: c_int = 0x2;
pub const FE_TOWARDZERO: c_int = 0x3;

pub type fexcept_t = c_uint;

bitflags! {
    /// A set of IEEE-754 exception classes, as sticky flags or trap enables.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Except: u32 {
        const INVALID = FE_INVALID as u32;
        const DIVBYZERO = FE_DIVBYZERO as u32;
        const OVERFLOW = FE_OVERFLOW as u32;
        const UNDERFLOW = FE_UNDERFLOW as u32;
        const INEXACT = FE_INEXACT as u32;
        const DENORMAL = FE_DENORMAL as u32;

        const ALL_EXCEPT = FE_ALL_EXCEPT as u32;
    }
}

impl Except {
    /// Interprets a C exception mask, dropping bits that name no exception.
    pub const fn from_raw(excepts: c_int) -> Self {
        Self::from_bits_truncate(excepts as u32)
    }

    pub const fn raw(self) -> c_int {
        self.bits() as c_int
    }
}

/// IEEE-754 rounding direction, encoded as the two-bit RMode field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Round {
    #[default]
    ToNearest = FE_TONEAREST,
    Upward = FE_UPWARD,
    Downward = FE_DOWNWARD,
    TowardZero = FE_TOWARDZERO,
}

impl Round {
    pub const fn from_raw(round: c_int) -> Option<Self> {
        match round {
            FE_TONEAREST => Some(Self::ToNearest),
            FE_UPWARD => Some(Self::Upward),
            FE_DOWNWARD => Some(Self::Downward),
            FE_TOWARDZERO => Some(Self::TowardZero),
            _ => None,
        }
    }

    /// Decodes an RMode field that has already been shifted down.
    pub(crate) const fn from_field(field: u32) -> Self {
        match field & 0x3 {
            0 => Self::ToNearest,
            1 => Self::Upward,
            2 => Self::Downward,
            _ => Self::TowardZero,
        }
    }

    pub(crate) const fn field(self) -> u32 {
        self as u32
    }

    pub const fn raw(self) -> c_int {
        self as c_int
    }
}

/// The floating-point environment of the calling thread.
///
/// Implemented once per register layout. Exception arguments are masked to
/// what the layout supports, so stray bits never reach control fields.
pub trait FloatEnv {
    /// Snapshot of the whole control and status state.
    type Env: Copy + Eq + core::fmt::Debug;

    /// Exceptions this layout reports.
    const SUPPORTED: Except;

    fn get_env(&self) -> Self::Env;

    /// Installs `env` as is. Recorded flags are restored but never trap.
    fn set_env(&self, env: &Self::Env);

    fn clear_except(&self, excepts: Except);

    /// Currently raised flags among `excepts`.
    fn get_except_flag(&self, excepts: Except) -> Except;

    /// For every exception in `excepts`, makes its flag match `flags`.
    fn set_except_flag(&self, flags: Except, excepts: Except);

    /// Raises `excepts` as if an instruction had produced them. A fault is
    /// delivered synchronously if any of them has its trap enabled; the flags
    /// are set before that happens.
    fn raise_except(&self, excepts: Except);

    fn test_except(&self, excepts: Except) -> Except {
        self.get_except_flag(excepts)
    }

    fn get_round(&self) -> Round;

    fn set_round(&self, round: Round);

    /// Saves the environment, then disables every trap and clears every flag.
    fn hold_except(&self) -> Self::Env;

    /// Restores `env`, merging in the flags raised since it was saved, and
    /// raises the merged set against the restored trap enables.
    fn update_env(&self, env: &Self::Env);

    /// Enables traps for `excepts`, returning the previous enable mask.
    fn enable_except(&self, excepts: Except) -> Result<Except, FenvError>;

    /// Disables traps for `excepts`, returning the previous enable mask.
    fn disable_except(&self, excepts: Except) -> Result<Except, FenvError>;

    /// Exceptions whose traps are enabled.
    fn get_except(&self) -> Except;

    /// Runs `f` with `round` installed, then puts the previous mode back.
    fn with_round<T>(&self, round: Round, f: impl FnOnce() -> T) -> T {
        let previous = self.get_round();
        self.set_round(round);
        let ret = f();
        self.set_round(previous);
        ret
    }

    /// Runs `f` between [`hold_except`](Self::hold_except) and
    /// [`update_env`](Self::update_env), so traps are deferred to the end.
    fn held<T>(&self, f: impl FnOnce() -> T) -> T {
        let env = self.hold_except();
        let ret = f();
        self.update_env(&env);
        ret
    }
}

#[cfg(all(
    target_arch = "arm",
    any(target_os = "linux", target_os = "android")
))]
pub use self::arch::arm::{fenv_t, native, Native, FE_DFL_ENV};

#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
pub use self::arch::aarch64::{fenv_t, native, Native, FE_DFL_ENV};

// Android builds must always carry the C symbols.
#[cfg(all(target_os = "android", target_arch = "arm"))]
const _: (fn() -> arch::arm::Fenv<Native>, unsafe extern "C" fn(*mut fenv_t) -> c_int) =
    (native, fegetenv);

#[cfg(all(target_os = "android", target_arch = "aarch64"))]
const _: (
    fn() -> arch::aarch64::Fenv<Native>,
    unsafe extern "C" fn(*mut fenv_t) -> c_int,
) = (native, fegetenv);
