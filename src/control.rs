//! UI-control proxy and the scoped setting guard.
//!
//! [`Control`] stands in for one window/control target described by up to
//! four match strings. With `store`, the target is resolved once at
//! construction to a stable window handle (failing if nothing matches) and
//! later commands address it as `ahk_id 0x<hwnd>`; without it, the match
//! parameters are re-evaluated by the engine on every command.
//!
//! Control-scoped commands run under [`ScopedSetting`], which overrides
//! the engine-global `A_ControlDelay` for exactly the duration of the
//! command and restores the previous value on every exit path, including
//! early `?` returns.

use crate::backend::{WindowHandle, WindowSpec};
use crate::bridge::Ahk;
use crate::error::{AhkError, AhkResult};
use crate::marshal::ToAhk;
use crate::script::Script;
use log::warn;

/// Engine-global setting governing the pacing of control commands.
const CONTROL_DELAY: &str = "A_ControlDelay";

/// Guard that temporarily overrides an engine-global setting.
///
/// Construction reads and remembers the current value, then writes the
/// override; dropping the guard writes the remembered value back. Because
/// restoration lives in `Drop`, it happens regardless of how the wrapped
/// operation exits.
pub struct ScopedSetting<'a> {
    ahk: &'a mut Ahk,
    name: String,
    saved: String,
}

impl<'a> ScopedSetting<'a> {
    /// Capture `name`'s current value and override it with `value`.
    pub fn new(ahk: &'a mut Ahk, name: &str, value: &dyn ToAhk) -> AhkResult<Self> {
        let saved = ahk.get(name)?;
        ahk.set(name, value)?;
        Ok(Self {
            ahk,
            name: name.to_string(),
            saved,
        })
    }

    /// The engine handle, for issuing commands under the override.
    pub fn engine(&mut self) -> &mut Ahk {
        self.ahk
    }
}

impl Drop for ScopedSetting<'_> {
    fn drop(&mut self) {
        // Failing to restore must not panic mid-unwind; the engine keeps
        // the override and the caller learns about it from the log.
        match self.ahk.set(&self.name, &self.saved) {
            Ok(true) => {}
            Ok(false) => warn!("engine refused to restore {} = {:?}", self.name, self.saved),
            Err(e) => warn!("failed to restore {}: {e}", self.name),
        }
    }
}

/// Host-side proxy for a window/control target.
#[derive(Clone, Debug)]
pub struct Control {
    spec: WindowSpec,
    hwnd: Option<WindowHandle>,
    delay_ms: i64,
}

impl Control {
    /// Build a control proxy from match parameters.
    ///
    /// With `store`, the target window is resolved immediately and the
    /// handle remembered; construction fails with
    /// [`AhkError::WindowNotFound`] when nothing matches. Without it,
    /// resolution is deferred to each command.
    pub fn new(script: &mut Script, spec: WindowSpec, store: bool) -> AhkResult<Self> {
        let hwnd = if store {
            let found = script.win_exist(&spec)?;
            Some(found.ok_or_else(|| AhkError::WindowNotFound {
                title: spec.title.clone(),
                text: spec.text.clone(),
            })?)
        } else {
            None
        };
        Ok(Self {
            spec,
            hwnd,
            delay_ms: 20,
        })
    }

    /// Stored window handle, if resolution was requested at construction.
    pub fn hwnd(&self) -> Option<WindowHandle> {
        self.hwnd
    }

    /// Delay applied to this proxy's commands, in milliseconds.
    pub fn delay(&self) -> i64 {
        self.delay_ms
    }

    /// Override the control delay applied while this proxy's commands run.
    pub fn set_delay(&mut self, ms: i64) {
        self.delay_ms = ms;
    }

    /// Match parameters as issued with each command: the stored handle
    /// reformulated as `ahk_id`, or the original four match strings.
    pub fn params(&self) -> WindowSpec {
        match self.hwnd {
            Some(hwnd) => WindowSpec::for_handle(hwnd),
            None => self.spec.clone(),
        }
    }

    /// Send keystrokes to a control of the target window. Returns whether
    /// the engine located the target and dispatched the input.
    pub fn send(&self, script: &mut Script, control: &str, keys: &str) -> AhkResult<bool> {
        let spec = self.params();
        let command = format!(
            "ControlSend, {control}, {keys}, {}, {}, {}, {}",
            spec.title, spec.text, spec.exclude_title, spec.exclude_text
        );
        self.run_delayed(script, &command)
    }

    /// Click a control of the target window.
    pub fn click(&self, script: &mut Script, control: &str) -> AhkResult<bool> {
        let spec = self.params();
        let command = format!("ControlClick, {control}, {}, {}", spec.title, spec.text);
        self.run_delayed(script, &command)
    }

    // Runs one control command under the scoped delay override; the saved
    // delay is restored before the target-found check reads ErrorLevel.
    fn run_delayed(&self, script: &mut Script, command: &str) -> AhkResult<bool> {
        let accepted = {
            let mut guard = ScopedSetting::new(script.engine_mut(), CONTROL_DELAY, &self.delay_ms)?;
            guard.engine().execute(command)?
        };
        Ok(accepted && script.engine_mut().get("ErrorLevel")? == "0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockEngine;

    fn script_with_window() -> (Script, WindowHandle) {
        let mut mock = MockEngine::new();
        let hwnd = mock.add_window("Untitled - Notepad", "status");
        let script = Script::with_backend(Box::new(mock)).unwrap();
        (script, hwnd)
    }

    #[test]
    fn test_unstored_control_keeps_params() {
        let (mut script, _) = script_with_window();
        let spec = WindowSpec {
            title: "title".into(),
            text: "text".into(),
            exclude_title: "extitle".into(),
            exclude_text: "extext".into(),
        };
        let ctl = Control::new(&mut script, spec.clone(), false).unwrap();
        assert_eq!(ctl.params(), spec);
        assert!(ctl.hwnd().is_none());
    }

    #[test]
    fn test_stored_control_resolves_to_handle() {
        let (mut script, hwnd) = script_with_window();
        let ctl = Control::new(&mut script, WindowSpec::title("Notepad"), true).unwrap();
        assert_eq!(ctl.hwnd(), Some(hwnd));
        let params = ctl.params();
        assert!(params.title.starts_with("ahk_id"));
        assert!(params.text.is_empty() && params.exclude_title.is_empty());
    }

    #[test]
    fn test_stored_control_fails_without_match() {
        let (mut script, _) = script_with_window();
        let err = Control::new(&mut script, WindowSpec::title("error"), true).unwrap_err();
        assert!(matches!(err, AhkError::WindowNotFound { .. }));
    }

    #[test]
    fn test_scoped_setting_restores_on_drop() {
        let (mut script, _) = script_with_window();
        let outer = script.engine_mut().get(CONTROL_DELAY).unwrap();
        {
            let mut guard =
                ScopedSetting::new(script.engine_mut(), CONTROL_DELAY, &50i64).unwrap();
            assert_eq!(guard.engine().get(CONTROL_DELAY).unwrap(), "50");
        }
        assert_eq!(script.engine_mut().get(CONTROL_DELAY).unwrap(), outer);
    }

    #[test]
    fn test_scoped_setting_restores_on_error_path() {
        let (mut script, _) = script_with_window();
        let outer = script.engine_mut().get(CONTROL_DELAY).unwrap();
        let result: AhkResult<()> = (|| {
            let mut guard =
                ScopedSetting::new(script.engine_mut(), CONTROL_DELAY, &50i64).unwrap();
            guard.engine().get("ok")?;
            Err(AhkError::Engine("forced failure".into()))
        })();
        assert!(result.is_err());
        assert_eq!(script.engine_mut().get(CONTROL_DELAY).unwrap(), outer);
    }
}
