pub type c_int = i32;
pub type c_uint = u32;

pub type ssize_t = isize;

pub type pid_t = c_int;
