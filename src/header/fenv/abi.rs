//! The `<fenv.h>` C symbols, bound to the executing core.

use super::{fenv_t, fexcept_t, native, Except, FloatEnv, Round, FE_DFL_ENV};
use crate::{error::mask_or_minus_one, platform::types::*};

/// The environment installed at program startup, passed as `FE_DFL_ENV`.
#[no_mangle]
pub static __fe_dfl_env: fenv_t = FE_DFL_ENV;

#[no_mangle]
pub unsafe extern "C" fn fegetenv(envp: *mut fenv_t) -> c_int {
    trace_expr!(
        {
            *envp = native().get_env();
            0
        },
        "fegetenv({:p})",
        envp
    )
}

#[no_mangle]
pub unsafe extern "C" fn fesetenv(envp: *const fenv_t) -> c_int {
    trace_expr!(
        {
            native().set_env(&*envp);
            0
        },
        "fesetenv({:p})",
        envp
    )
}

#[no_mangle]
pub unsafe extern "C" fn feclearexcept(excepts: c_int) -> c_int {
    trace_expr!(
        {
            native().clear_except(Except::from_raw(excepts));
            0
        },
        "feclearexcept({:#x})",
        excepts
    )
}

#[no_mangle]
pub unsafe extern "C" fn fegetexceptflag(flagp: *mut fexcept_t, excepts: c_int) -> c_int {
    trace_expr!(
        {
            *flagp = native().get_except_flag(Except::from_raw(excepts)).bits();
            0
        },
        "fegetexceptflag({:p}, {:#x})",
        flagp,
        excepts
    )
}

/// Sets the flags in `excepts` to the states stored in `*flagp`. No trap is
/// taken, even for exceptions whose traps are enabled.
#[no_mangle]
pub unsafe extern "C" fn fesetexceptflag(flagp: *const fexcept_t, excepts: c_int) -> c_int {
    trace_expr!(
        {
            native().set_except_flag(Except::from_bits_truncate(*flagp), Except::from_raw(excepts));
            0
        },
        "fesetexceptflag({:p}, {:#x})",
        flagp,
        excepts
    )
}

/// Raises `excepts`. If any of them is trapped, `SIGFPE` (or the registered
/// fault hook) is delivered before this returns.
#[no_mangle]
pub unsafe extern "C" fn feraiseexcept(excepts: c_int) -> c_int {
    trace_expr!(
        {
            native().raise_except(Except::from_raw(excepts));
            0
        },
        "feraiseexcept({:#x})",
        excepts
    )
}

#[no_mangle]
pub unsafe extern "C" fn fetestexcept(excepts: c_int) -> c_int {
    trace_expr!(
        native().test_except(Except::from_raw(excepts)).raw(),
        "fetestexcept({:#x})",
        excepts
    )
}

#[no_mangle]
pub unsafe extern "C" fn fegetround() -> c_int {
    trace_expr!(native().get_round().raw(), "fegetround()")
}

/// Returns -1 and leaves the mode alone if `round` is not a rounding
/// direction macro.
#[no_mangle]
pub unsafe extern "C" fn fesetround(round: c_int) -> c_int {
    trace_expr!(
        match Round::from_raw(round) {
            Some(round) => {
                native().set_round(round);
                0
            }
            None => -1,
        },
        "fesetround({})",
        round
    )
}

#[no_mangle]
pub unsafe extern "C" fn feholdexcept(envp: *mut fenv_t) -> c_int {
    trace_expr!(
        {
            *envp = native().hold_except();
            0
        },
        "feholdexcept({:p})",
        envp
    )
}

#[no_mangle]
pub unsafe extern "C" fn feupdateenv(envp: *const fenv_t) -> c_int {
    trace_expr!(
        {
            native().update_env(&*envp);
            0
        },
        "feupdateenv({:p})",
        envp
    )
}

/// Returns the previous enable mask, or -1 if the core did not take the
/// new one.
#[no_mangle]
pub unsafe extern "C" fn feenableexcept(mask: c_int) -> c_int {
    trace_expr!(
        mask_or_minus_one(native().enable_except(Except::from_raw(mask))),
        "feenableexcept({:#x})",
        mask
    )
}

#[no_mangle]
pub unsafe extern "C" fn fedisableexcept(mask: c_int) -> c_int {
    trace_expr!(
        mask_or_minus_one(native().disable_except(Except::from_raw(mask))),
        "fedisableexcept({:#x})",
        mask
    )
}

#[no_mangle]
pub unsafe extern "C" fn fegetexcept() -> c_int {
    trace_expr!(native().get_except().raw(), "fegetexcept()")
}
