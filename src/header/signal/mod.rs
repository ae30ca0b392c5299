//! signal.h subset needed for floating-point fault delivery, following
//! http://pubs.opengroup.org/onlinepubs/7908799/xsh/signal.h.html

use crate::platform::types::c_int;

/// Erroneous arithmetic operation.
pub const SIGFPE: c_int = 8;
