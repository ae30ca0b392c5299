use core::fmt;

use crate::{header::fenv::Except, platform::types::c_int};

/// Failures reported by the floating-point environment controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FenvError {
    /// The core did not retain a trap-enable configuration that was written.
    ///
    /// `retained` is the enable mask read back after the write, i.e. whatever
    /// partial effect the hardware actually applied.
    Unsupported { requested: Except, retained: Except },
}

impl fmt::Display for FenvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported {
                requested,
                retained,
            } => write!(
                f,
                "trap enables not supported by this core (requested {:#x}, retained {:#x})",
                requested.bits(),
                retained.bits()
            ),
        }
    }
}

impl core::error::Error for FenvError {}

pub trait ResultExt<T> {
    fn or_minus_one(self) -> T;
}
impl<T: From<i8>> ResultExt<T> for Result<T, FenvError> {
    fn or_minus_one(self) -> T {
        match self {
            Self::Ok(v) => v,
            Self::Err(err) => {
                log::debug!("{err}");
                T::from(-1)
            }
        }
    }
}

/// Converts an exception mask result into the value `fe{en,dis}ableexcept` return.
pub fn mask_or_minus_one(res: Result<Except, FenvError>) -> c_int {
    res.map(|mask| mask.bits() as c_int).or_minus_one()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_one_on_unsupported() {
        let err = FenvError::Unsupported {
            requested: Except::OVERFLOW,
            retained: Except::empty(),
        };
        assert_eq!(mask_or_minus_one(Err(err)), -1);
        assert_eq!(
            mask_or_minus_one(Ok(Except::INVALID | Except::INEXACT)),
            0x11
        );
    }

    #[test]
    fn display_names_masks() {
        let err = FenvError::Unsupported {
            requested: Except::DIVBYZERO | Except::OVERFLOW,
            retained: Except::DIVBYZERO,
        };
        assert_eq!(
            err.to_string(),
            "trap enables not supported by this core (requested 0x6, retained 0x2)"
        );
    }
}
