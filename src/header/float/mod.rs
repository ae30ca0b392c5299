//! float.h implementation, following
//! http://pubs.opengroup.org/onlinepubs/7908799/xsh/float.h.html

use crate::{
    header::fenv::{FloatEnv, Round},
    platform::types::*,
};

pub const FLT_RADIX: c_int = 2;

/// The value `FLT_ROUNDS` takes under `env`'s current rounding mode.
pub fn flt_rounds<E: FloatEnv>(env: &E) -> c_int {
    match env.get_round() {
        Round::TowardZero => 0,
        Round::ToNearest => 1,
        Round::Upward => 2,
        Round::Downward => 3,
    }
}

#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    any(target_os = "linux", target_os = "android")
))]
#[no_mangle]
pub unsafe extern "C" fn __flt_rounds() -> c_int {
    flt_rounds(&crate::header::fenv::native())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::fenv::arch::{aarch64, arm};

    #[test]
    fn follows_rounding_mode() {
        let vfp = arm::EmulatedVfp::new();
        let fenv = arm::Fenv::new(&vfp);
        assert_eq!(flt_rounds(&fenv), 1);

        for (round, expected) in [
            (Round::TowardZero, 0),
            (Round::ToNearest, 1),
            (Round::Upward, 2),
            (Round::Downward, 3),
        ] {
            fenv.set_round(round);
            assert_eq!(flt_rounds(&fenv), expected);
        }

        let fpu = aarch64::EmulatedFpu::new();
        let fenv = aarch64::Fenv::new(&fpu);
        fenv.set_round(Round::Downward);
        assert_eq!(flt_rounds(&fenv), 3);
    }
}
