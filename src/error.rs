//! Custom error types for the bridge.
//!
//! This module defines the primary error type, `AhkError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to report the failure classes the bridge distinguishes:
//!
//! - **`NotReady`**: a command was issued while the engine handle is not in
//!   the started state. These are programmer errors in the caller's
//!   lifecycle handling and are never retried automatically.
//! - **`Conversion`**: text coming back from the engine could not be parsed
//!   into the caller-declared type. Absence is *not* an error (a missing
//!   variable reads as empty text), but converting that empty text to a
//!   numeric type fails loudly here rather than silently coercing.
//! - **`ReservedName` / `AlreadyDeclared`**: a proxy was declared under a
//!   name that collides with the proxy object's own surface, or twice.
//!   Raised at declaration time, before any engine interaction.
//! - **`WindowNotFound`**: a control proxy requested immediate handle
//!   storage but no window matched.
//! - **`PollTimeout`**: a bounded sampling loop exhausted its budget.
//! - **`Engine`**: the engine library itself reported a failure.
//! - **`Io`**: file injection (`add_file`) could not read its source.
//!
//! Expected-absence conditions (missing variable, unknown function or
//! label) are deliberately *not* represented here; they surface as empty
//! text, a null address, or `false` so callers branch on values instead of
//! catching errors.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AhkResult<T> = std::result::Result<T, AhkError>;

/// Failure classes surfaced by the bridge and the proxy layer.
#[derive(Error, Debug)]
pub enum AhkError {
    /// Command issued while the engine is not in the started state.
    #[error("engine not ready for '{0}' (start it and poll ready() first)")]
    NotReady(String),

    /// Engine text could not be parsed into the declared type.
    #[error("cannot convert {value:?} to {target}")]
    Conversion {
        /// The offending text as received from the engine.
        value: String,
        /// Name of the requested target type.
        target: &'static str,
    },

    /// Declaration under a reserved or internal-prefix name.
    #[error("name '{0}' is reserved and cannot be declared")]
    ReservedName(String),

    /// Declaration under a name already registered on the same script.
    #[error("name '{0}' is already declared on this script")]
    AlreadyDeclared(String),

    /// Typed access to a name never declared on the script.
    #[error("name '{0}' was never declared on this script")]
    Undeclared(String),

    /// Control construction requested a stored handle but nothing matched.
    #[error("no window matched title={title:?} text={text:?}")]
    WindowNotFound {
        /// Title match string the lookup used.
        title: String,
        /// Text match string the lookup used.
        text: String,
    },

    /// A bounded sampling loop exhausted its budget.
    #[error("condition not met after {attempts} samples")]
    PollTimeout {
        /// Number of samples taken before giving up.
        attempts: u32,
    },

    /// The engine library reported a failure of its own.
    #[error("engine error: {0}")]
    Engine(String),

    /// File injection could not read its source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
