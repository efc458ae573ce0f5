/**
 * Error taxonomy shared by the worker and the coordinator.
 *
 * Every fallible FSM action returns `Result<State, CrackerError>`. Each
 * variant carries a human message plus a `Location` captured at the call
 * site — the Rust equivalent of the C `fsm_error` struct (`err_msg`,
 * `function_name`, `file_name`, `error_line`) and its `SET_ERROR` macro.
 */
use std::fmt;

/// Call-site metadata attached to every `CrackerError`.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in {}", self.file, self.line, self.function)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrackerError {
    #[error("invalid argument: {message} ({location})")]
    Argument { message: String, location: Location },

    #[error("address resolution failed: {message} ({location})")]
    Resolution { message: String, location: Location },

    #[error("socket error: {message} ({location})")]
    Socket { message: String, location: Location },

    #[error("io error: {message} ({location})")]
    Io { message: String, location: Location },

    #[error("protocol error: {message} ({location})")]
    Protocol { message: String, location: Location },

    #[error("checkpoint out of range: {message} ({location})")]
    Range { message: String, location: Location },

    #[error("assignment timed out: {message} ({location})")]
    Timeout { message: String, location: Location },
}

impl CrackerError {
    pub fn location(&self) -> Location {
        match self {
            CrackerError::Argument { location, .. }
            | CrackerError::Resolution { location, .. }
            | CrackerError::Socket { location, .. }
            | CrackerError::Io { location, .. }
            | CrackerError::Protocol { location, .. }
            | CrackerError::Range { location, .. }
            | CrackerError::Timeout { location, .. } => *location,
        }
    }
}

/// Resolves to the name of the function this macro is expanded in.
/// There is no `__func__` in Rust; this is the usual `type_name_of_val`
/// trick used to fake one.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn marker() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(marker);
        &name[..name.len() - "::marker".len()]
    }};
}

/// Builds a `CrackerError` of the given variant, capturing file/line/function
/// at the call site. Usage: `cracker_error!(Protocol, "unexpected {}", tok)`.
#[macro_export]
macro_rules! cracker_error {
    ($variant:ident, $($arg:tt)*) => {
        $crate::error::CrackerError::$variant {
            message: format!($($arg)*),
            location: $crate::error::Location {
                file: file!(),
                line: line!(),
                function: $crate::__function_name!(),
            },
        }
    };
}
