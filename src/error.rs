//! Error types for the runtime support layer.
//!
//! Only the unrecoverable caller/configuration errors surface as
//! [`RuntimeError`]; the embedding driver decides whether they terminate
//! the process. Ordinary misses (unknown scope name, absent user data,
//! failed file open) are expressed as `Option` returns or zero tokens at
//! their call sites.

use thiserror::Error;

/// Unrecoverable caller/configuration errors.
///
/// These invalidate the current run; there is no partial-progress state
/// worth preserving, so callers typically report the message and exit.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A plusarg query ran before the driver ever stored an argument list.
    #[error(
        "plusarg query before any arguments were loaded; \
         the driver must store the command line first"
    )]
    ArgsNotLoaded,

    /// An export name was resolved that no loaded model ever registered.
    #[error("called export function `{0}`, but no such export exists in any loaded model")]
    UnknownExport(String),
}

/// Result type for runtime operations that can fail unrecoverably.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
