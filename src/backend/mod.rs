//! Engine backend implementations.
//!
//! This module defines the [`EngineBackend`] trait, the raw blocking
//! surface of one embedded engine instance, plus the scalar types that
//! cross it. Two implementations exist:
//!
//! - [`mock::MockEngine`]: in-process emulation of the engine's observable
//!   protocol, used by the test suite.
//! - `dll::DllEngine`: the real engine library via `ahkdll-sys`, compiled
//!   only with the `ahk_dll` feature.
//!
//! The bridge (`crate::bridge::Ahk`) is the sole caller of this trait; no
//! other component reaches the engine directly.

pub mod mock;

#[cfg(feature = "ahk_dll")]
pub mod dll;

pub use mock::MockEngine;

use crate::error::AhkResult;
use std::any::Any;
use std::fmt;

/// Opaque handle to a line, function or label inside the currently loaded
/// code. Zero always means "not found". Handles are invalidated by
/// `reload`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Addr(pub usize);

impl Addr {
    /// The "not found" sentinel.
    pub const NULL: Addr = Addr(0);

    /// Whether this is the "not found" sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Opaque handle to a resolved window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// How `exec_line` treats the addressed line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Do not execute; report the engine's current line.
    Query,
    /// Execute the single line without waiting for completion.
    Run,
    /// Execute the single line and block until it has run.
    RunWait,
}

/// Parameters for launching the engine thread.
///
/// All fields default to empty, which starts the engine with a blank
/// script ready for code injection.
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    /// Initial script text, if any.
    pub script: String,
    /// Engine command-line style options.
    pub options: String,
    /// Parameters made available to the script.
    pub parameters: String,
}

/// Up to four match strings resolving a target window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowSpec {
    /// Substring the window title must contain, or `ahk_id 0x..` for a
    /// previously resolved handle.
    pub title: String,
    /// Substring the window text must contain.
    pub text: String,
    /// Title substring that disqualifies a window.
    pub exclude_title: String,
    /// Text substring that disqualifies a window.
    pub exclude_text: String,
}

impl WindowSpec {
    /// Spec matching on title only.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Reformulate this spec around a resolved handle: the title becomes
    /// `ahk_id 0x<hwnd>` and the remaining match strings are cleared.
    pub fn for_handle(hwnd: WindowHandle) -> Self {
        Self {
            title: format!("ahk_id {hwnd}"),
            ..Self::default()
        }
    }
}

/// The raw, blocking surface of one embedded engine instance.
///
/// Every method is a synchronous call into the engine from the calling
/// thread; none spawns concurrent host-side work. Expected absence is
/// reported in-band (`""`, [`Addr::NULL`], `false`, `None`); `Err` is for
/// engine/transport failures only.
pub trait EngineBackend: Send {
    /// Launch the engine thread. Readiness is asynchronous; poll
    /// [`EngineBackend::ready`] afterwards.
    fn start(&mut self, options: &StartOptions) -> AhkResult<()>;

    /// One non-blocking readiness probe.
    fn ready(&mut self) -> bool;

    /// Request engine shutdown. Does not block until shutdown completes.
    fn terminate(&mut self) -> AhkResult<()>;

    /// Discard injected code and variable state and restart from the
    /// original entry point. Invalidates all previously returned [`Addr`]s.
    fn reload(&mut self) -> AhkResult<()>;

    /// Write `value` into the named (possibly new) variable. `Ok(false)`
    /// means the engine refused the assignment.
    fn set_var(&mut self, name: &str, value: &str) -> AhkResult<bool>;

    /// Read the named variable as text. Missing variables read as empty
    /// text, never an error.
    fn get_var(&mut self, name: &str) -> AhkResult<String>;

    /// Run an ad-hoc snippet in the current execution context. `Ok(false)`
    /// means the engine rejected it.
    fn exec(&mut self, code: &str) -> AhkResult<bool>;

    /// Inject a block of code, returning the address of its first line.
    /// With `execute`, the injected top level runs immediately.
    fn add_lines(&mut self, code: &str, execute: bool) -> AhkResult<Addr>;

    /// Transfer the execution point to a label. `Ok(false)` when the label
    /// does not exist.
    fn jump(&mut self, label: &str) -> AhkResult<bool>;

    /// Call a named function synchronously and return its textual result.
    /// An unknown function yields empty text (the protocol's sentinel).
    fn call(&mut self, name: &str, args: &[String]) -> AhkResult<String>;

    /// Dispatch a named function call without waiting for its result.
    /// `Ok(true)` means the function was found and the call dispatched.
    fn post(&mut self, name: &str, args: &[String]) -> AhkResult<bool>;

    /// Resolve a function name to its address, [`Addr::NULL`] if unknown.
    fn find_func(&mut self, name: &str) -> AhkResult<Addr>;

    /// Resolve a label name to its line address, [`Addr::NULL`] if unknown.
    fn find_label(&mut self, name: &str) -> AhkResult<Addr>;

    /// Execute the single line at `addr`, returning the address of the
    /// line that would run next. [`ExecMode::Query`] executes nothing and
    /// reports the engine's current line; `addr` is not consulted.
    fn exec_line(&mut self, addr: Addr, mode: ExecMode) -> AhkResult<Addr>;

    /// Resolve a window spec to a handle, `None` when nothing matches.
    fn find_window(&mut self, spec: &WindowSpec) -> AhkResult<Option<WindowHandle>>;

    /// Downcasting hook so tests can reach implementation-specific state
    /// (the mock's recorded inputs) behind the boxed trait object.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_null_sentinel() {
        assert!(Addr::NULL.is_null());
        assert!(!Addr(7).is_null());
    }

    #[test]
    fn test_window_spec_for_handle() {
        let spec = WindowSpec::for_handle(WindowHandle(42));
        assert_eq!(spec.title, "ahk_id 0x2a");
        assert!(spec.text.is_empty());
        assert!(spec.exclude_title.is_empty());
        assert!(spec.exclude_text.is_empty());
    }
}
