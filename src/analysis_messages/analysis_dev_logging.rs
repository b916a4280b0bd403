// Extra timer logging
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

// FOOTPRINT LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_footprints")]
macro_rules! footprint_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_footprints"))]
macro_rules! footprint_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// SOLVER LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_solver")]
macro_rules! solver_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_solver"))]
macro_rules! solver_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// COLLAPSE LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_collapse")]
macro_rules! collapse_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_collapse"))]
macro_rules! collapse_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
