//! Hosts without a raw syscall layer. Writes are dropped and signals cannot
//! be sent.

use super::types::*;

pub fn e(sys: usize) -> usize {
    sys
}

pub struct Sys;

impl Sys {
    pub fn gettid() -> pid_t {
        0
    }

    pub fn tkill(_tid: pid_t, _sig: c_int) -> c_int {
        -1
    }

    pub fn raise(_sig: c_int) -> c_int {
        -1
    }

    pub fn write(_fildes: c_int, buf: &[u8]) -> ssize_t {
        buf.len() as ssize_t
    }
}
