#[cfg(not(test))]
macro_rules! debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(test)]
macro_rules! debug {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}
