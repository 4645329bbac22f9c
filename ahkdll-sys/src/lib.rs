//! Raw FFI bindings for the AutoHotkey dll (Unicode build).
//!
//! The exported surface is a flat set of functions taking and returning
//! primitive scalars and null-terminated UTF-16 strings, so the bindings are
//! written out by hand instead of generated. Everything is gated behind the
//! `ahk-dll` feature: without it this crate compiles to nothing, and the
//! workspace builds on machines that do not have the engine library
//! installed.
//!
//! Pointer-sized return values (`usize` here, `UINT_PTR` in the dll headers)
//! are opaque line/function/label handles; zero always means "not found".
//! All strings crossing this boundary must be null-terminated UTF-16.

#![cfg_attr(not(feature = "ahk-dll"), allow(unused))]
#![no_std]

use core::ffi::c_int;

/// Null-terminated UTF-16 string pointer, the dll's native text type.
pub type WStr = *const u16;

#[cfg(feature = "ahk-dll")]
#[link(name = "AutoHotkey")]
extern "C" {
    /// Launch the engine thread from a script file path. Returns the engine
    /// thread handle, or zero on failure.
    pub fn ahkdll(path: WStr, options: WStr, params: WStr) -> usize;

    /// Launch the engine thread from in-memory script text.
    pub fn ahktextdll(script: WStr, options: WStr, params: WStr) -> usize;

    /// Non-blocking readiness probe: non-zero once the engine thread accepts
    /// commands.
    pub fn ahkReady() -> c_int;

    /// Request engine shutdown, waiting at most `timeout` milliseconds for
    /// the script thread to exit.
    pub fn ahkTerminate(timeout: c_int) -> c_int;

    /// Discard injected code and variables and restart from the original
    /// entry point. Invalidates every previously returned line handle.
    pub fn ahkReload();

    /// Execute an ad-hoc snippet in the current context. Non-zero on
    /// success.
    pub fn ahkExec(script: WStr) -> c_int;

    /// Add script text to the running program; returns the handle of the
    /// first added line. `execute` non-zero runs the added top level
    /// immediately.
    pub fn addScript(script: WStr, execute: c_int) -> usize;

    /// Add script lines from a file. `execute` as for [`addScript`].
    pub fn addFile(path: WStr, execute: c_int) -> usize;

    /// Assign text to a (possibly new) global variable. Returns 0 on
    /// success, -1 on failure.
    pub fn ahkassign(name: WStr, value: WStr) -> c_int;

    /// Read a global variable as text. Missing variables yield an empty
    /// string, never an error. `get_pointer` non-zero returns the raw
    /// variable address instead of its contents.
    pub fn ahkgetvar(name: WStr, get_pointer: c_int) -> WStr;

    /// Call a named function with up to ten textual arguments and wait for
    /// its result. Unused slots must be null.
    pub fn ahkFunction(
        name: WStr,
        p1: WStr,
        p2: WStr,
        p3: WStr,
        p4: WStr,
        p5: WStr,
        p6: WStr,
        p7: WStr,
        p8: WStr,
        p9: WStr,
        p10: WStr,
    ) -> WStr;

    /// Post a named function call without waiting for completion. Returns 0
    /// when the function exists and the call was dispatched.
    pub fn ahkPostFunction(
        name: WStr,
        p1: WStr,
        p2: WStr,
        p3: WStr,
        p4: WStr,
        p5: WStr,
        p6: WStr,
        p7: WStr,
        p8: WStr,
        p9: WStr,
        p10: WStr,
    ) -> c_int;

    /// Jump the execution point to a label. `nowait` non-zero posts the jump
    /// instead of waiting for the label body. Non-zero return means the
    /// label was found.
    pub fn ahkLabel(name: WStr, nowait: c_int) -> c_int;

    /// Resolve a function name to its handle, zero if not found.
    pub fn ahkFindFunc(name: WStr) -> usize;

    /// Resolve a label name to the handle of its line, zero if not found.
    pub fn ahkFindLabel(name: WStr) -> usize;

    /// Execute the single line identified by `line`. Mode 0 only returns the
    /// handle of the current line; `wait` non-zero blocks until the line has
    /// run. Returns the handle of the next line.
    pub fn ahkExecuteLine(line: usize, mode: c_int, wait: c_int) -> usize;
}
