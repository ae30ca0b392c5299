//! Floating-point environment runtime for ARM (VFP) and AArch64.
//!
//! The C ABI of `<fenv.h>` is exported on those two targets only. The
//! register-layout logic behind it is available everywhere through
//! [`header::fenv::FloatEnv`] and the emulated register backends.

#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

#[macro_use]
pub mod macros;

pub mod error;
pub mod header;
pub mod platform;
