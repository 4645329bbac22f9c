//! Core library for the rust_ahk bridge.
//!
//! This crate drives an embedded AutoHotkey-style scripting engine as a
//! subordinate execution context inside the host process: inject code,
//! read and write engine-side variables, invoke engine-side functions and
//! steer program flow, all through synchronous, blocking calls with
//! explicit lifecycle state. The real engine library is reached through
//! the feature-gated `ahk_dll` backend; a protocol-faithful mock backs
//! the test suite.

pub mod backend;
pub mod bridge;
pub mod control;
pub mod error;
pub mod marshal;
pub mod poll;
pub mod script;

pub use backend::{Addr, EngineBackend, ExecMode, MockEngine, StartOptions, WindowHandle, WindowSpec};
pub use bridge::{Ahk, EngineState};
pub use control::{Control, ScopedSetting};
pub use error::{AhkError, AhkResult};
pub use marshal::{Color, FromAhk, ToAhk};
pub use poll::{poll_until, wait_until, RetryPolicy};
pub use script::{Function, Script};
