//! C header implementations.

pub mod fenv;
pub mod float;
pub mod signal;
