//! Real engine backend over the AutoHotkey dll.
//!
//! Compiled only with the `ahk_dll` feature, which requires the engine
//! library (Unicode build) to be linkable. All text crossing the boundary
//! is re-encoded as null-terminated UTF-16; returned wide strings are
//! decoded lossily, matching the engine's own tolerance for malformed
//! pairs.
//!
//! The dll hosts a single process-global engine thread, so at most one
//! `DllEngine` per process is meaningful; tests against it must be
//! serialized (see the `hardware_tests` feature).

#![allow(unsafe_code)]

use super::{Addr, EngineBackend, ExecMode, StartOptions, WindowHandle, WindowSpec};
use crate::error::{AhkError, AhkResult};
use log::debug;

/// Engine backend calling straight into the dll.
#[derive(Default)]
pub struct DllEngine;

impl DllEngine {
    /// New handle over the process-global engine library.
    pub fn new() -> Self {
        Self
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode a null-terminated UTF-16 string returned by the dll. A null
/// pointer decodes as empty text, the protocol's absence sentinel.
unsafe fn from_wide(ptr: ahkdll_sys::WStr) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let slice = std::slice::from_raw_parts(ptr, len);
    String::from_utf16_lossy(slice)
}

// Argument slots beyond the provided args must be null, not empty text.
fn arg_ptr(args: &[Vec<u16>], index: usize) -> ahkdll_sys::WStr {
    args.get(index)
        .map(|a| a.as_ptr())
        .unwrap_or(std::ptr::null())
}

impl EngineBackend for DllEngine {
    fn start(&mut self, options: &StartOptions) -> AhkResult<()> {
        let script = wide(&options.script);
        let opts = wide(&options.options);
        let params = wide(&options.parameters);
        let thread = unsafe { ahkdll_sys::ahktextdll(script.as_ptr(), opts.as_ptr(), params.as_ptr()) };
        if thread == 0 {
            return Err(AhkError::Engine("engine thread failed to launch".into()));
        }
        debug!("engine thread launched (handle 0x{thread:x})");
        Ok(())
    }

    fn ready(&mut self) -> bool {
        unsafe { ahkdll_sys::ahkReady() != 0 }
    }

    fn terminate(&mut self) -> AhkResult<()> {
        unsafe { ahkdll_sys::ahkTerminate(0) };
        Ok(())
    }

    fn reload(&mut self) -> AhkResult<()> {
        unsafe { ahkdll_sys::ahkReload() };
        Ok(())
    }

    fn set_var(&mut self, name: &str, value: &str) -> AhkResult<bool> {
        let name = wide(name);
        let value = wide(value);
        let rc = unsafe { ahkdll_sys::ahkassign(name.as_ptr(), value.as_ptr()) };
        Ok(rc == 0)
    }

    fn get_var(&mut self, name: &str) -> AhkResult<String> {
        let name = wide(name);
        Ok(unsafe { from_wide(ahkdll_sys::ahkgetvar(name.as_ptr(), 0)) })
    }

    fn exec(&mut self, code: &str) -> AhkResult<bool> {
        let code = wide(code);
        Ok(unsafe { ahkdll_sys::ahkExec(code.as_ptr()) != 0 })
    }

    fn add_lines(&mut self, code: &str, execute: bool) -> AhkResult<Addr> {
        let code = wide(code);
        let addr = unsafe { ahkdll_sys::addScript(code.as_ptr(), execute as i32) };
        Ok(Addr(addr))
    }

    fn jump(&mut self, label: &str) -> AhkResult<bool> {
        let label = wide(label);
        Ok(unsafe { ahkdll_sys::ahkLabel(label.as_ptr(), 0) != 0 })
    }

    fn call(&mut self, name: &str, args: &[String]) -> AhkResult<String> {
        let name = wide(name);
        let args: Vec<Vec<u16>> = args.iter().map(|a| wide(a)).collect();
        let result = unsafe {
            ahkdll_sys::ahkFunction(
                name.as_ptr(),
                arg_ptr(&args, 0),
                arg_ptr(&args, 1),
                arg_ptr(&args, 2),
                arg_ptr(&args, 3),
                arg_ptr(&args, 4),
                arg_ptr(&args, 5),
                arg_ptr(&args, 6),
                arg_ptr(&args, 7),
                arg_ptr(&args, 8),
                arg_ptr(&args, 9),
            )
        };
        Ok(unsafe { from_wide(result) })
    }

    fn post(&mut self, name: &str, args: &[String]) -> AhkResult<bool> {
        let name = wide(name);
        let args: Vec<Vec<u16>> = args.iter().map(|a| wide(a)).collect();
        let rc = unsafe {
            ahkdll_sys::ahkPostFunction(
                name.as_ptr(),
                arg_ptr(&args, 0),
                arg_ptr(&args, 1),
                arg_ptr(&args, 2),
                arg_ptr(&args, 3),
                arg_ptr(&args, 4),
                arg_ptr(&args, 5),
                arg_ptr(&args, 6),
                arg_ptr(&args, 7),
                arg_ptr(&args, 8),
                arg_ptr(&args, 9),
            )
        };
        Ok(rc == 0)
    }

    fn find_func(&mut self, name: &str) -> AhkResult<Addr> {
        let name = wide(name);
        Ok(Addr(unsafe { ahkdll_sys::ahkFindFunc(name.as_ptr()) }))
    }

    fn find_label(&mut self, name: &str) -> AhkResult<Addr> {
        let name = wide(name);
        Ok(Addr(unsafe { ahkdll_sys::ahkFindLabel(name.as_ptr()) }))
    }

    fn exec_line(&mut self, addr: Addr, mode: ExecMode) -> AhkResult<Addr> {
        let (mode, wait) = match mode {
            ExecMode::Query => (0, 0),
            ExecMode::Run => (1, 0),
            ExecMode::RunWait => (1, 1),
        };
        Ok(Addr(unsafe { ahkdll_sys::ahkExecuteLine(addr.0, mode, wait) }))
    }

    fn find_window(&mut self, spec: &WindowSpec) -> AhkResult<Option<WindowHandle>> {
        // WinExist is a built-in function, reachable through the same
        // call surface as user functions.
        let args = [
            spec.title.clone(),
            spec.text.clone(),
            spec.exclude_title.clone(),
            spec.exclude_text.clone(),
        ];
        let text = self.call("WinExist", &args)?;
        let text = text.trim();
        let hwnd = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => text.parse::<u64>().ok(),
        };
        Ok(hwnd.filter(|h| *h != 0).map(WindowHandle))
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
