#[macro_export]
#[cfg(not(feature = "trace"))]
macro_rules! trace_expr {
    ($expr:expr, $($arg:tt)*) => {
        $expr
    };
}

/// Evaluates `$expr`, logging the call and its return value at trace level.
#[macro_export]
#[cfg(feature = "trace")]
macro_rules! trace_expr {
    ($expr:expr, $($arg:tt)*) => ({
        log::trace!("{}", format_args!($($arg)*));

        let ret = $expr;

        log::trace!("{} = {}", format_args!($($arg)*), ret);

        ret
    });
}
