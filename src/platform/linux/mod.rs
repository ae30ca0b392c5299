use sc::syscall;

use super::types::*;

/// Maps a raw syscall return to `!0` on failure.
pub fn e(sys: usize) -> usize {
    if (sys as isize) < 0 && (sys as isize) >= -4095 {
        !0
    } else {
        sys
    }
}

pub struct Sys;

impl Sys {
    pub fn gettid() -> pid_t {
        e(unsafe { syscall!(GETTID) }) as pid_t
    }

    pub fn tkill(tid: pid_t, sig: c_int) -> c_int {
        e(unsafe { syscall!(TKILL, tid, sig) }) as c_int
    }

    /// Sends `sig` to the calling thread.
    pub fn raise(sig: c_int) -> c_int {
        let tid = Sys::gettid();
        if tid < 0 {
            return -1;
        }
        Sys::tkill(tid, sig)
    }

    pub fn write(fildes: c_int, buf: &[u8]) -> ssize_t {
        e(unsafe { syscall!(WRITE, fildes, buf.as_ptr(), buf.len()) }) as ssize_t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_is_per_thread() {
        let tid = Sys::gettid();
        assert!(tid > 0);

        let other = std::thread::spawn(Sys::gettid).join().unwrap();
        assert!(other > 0);
        assert_ne!(other, tid);
    }

    #[test]
    fn tkill_targets_a_thread() {
        // Signal 0 only checks that the target exists.
        assert_eq!(Sys::tkill(Sys::gettid(), 0), 0);
        assert_eq!(Sys::raise(0), 0);
        assert_eq!(Sys::tkill(-1, 0), -1);
    }

    #[test]
    fn write_to_bad_fd_fails() {
        assert_eq!(Sys::write(-1, b"x"), -1);
    }

    #[test]
    fn raw_error_range() {
        assert_eq!(e(-9isize as usize), !0);
        assert_eq!(e(3), 3);
    }
}
