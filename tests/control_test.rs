//! Integration tests for the control proxy and the scoped delay override.

use rust_ahk::backend::mock::{ControlInput, InputKind};
use rust_ahk::{AhkError, Control, MockEngine, Script, WindowSpec};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn script_with_notepad() -> Script {
    init_logging();
    let mut mock = MockEngine::new();
    mock.add_window("Untitled - Notepad", "");
    Script::with_backend(Box::new(mock)).unwrap()
}

fn recorded_inputs(script: &mut Script) -> Vec<ControlInput> {
    script
        .engine_mut()
        .backend_mut()
        .as_any_mut()
        .downcast_mut::<MockEngine>()
        .expect("mock backend")
        .inputs()
        .to_vec()
}

#[test]
fn test_send_reaches_target_window() {
    let mut script = script_with_notepad();
    let ctl = Control::new(&mut script, WindowSpec::title("Notepad"), false).unwrap();

    assert!(ctl.send(&mut script, "Edit1", "hello").unwrap());

    let inputs = recorded_inputs(&mut script);
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].kind, InputKind::Send);
    assert_eq!(inputs[0].control, "Edit1");
    assert_eq!(inputs[0].keys, "hello");
    assert_eq!(inputs[0].title, "Notepad");
}

#[test]
fn test_stored_control_addresses_by_handle() {
    let mut script = script_with_notepad();
    let ctl = Control::new(&mut script, WindowSpec::title("Notepad"), true).unwrap();
    let hwnd = ctl.hwnd().expect("stored handle");

    assert!(ctl.click(&mut script, "Button1").unwrap());

    let inputs = recorded_inputs(&mut script);
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].kind, InputKind::Click);
    assert_eq!(inputs[0].title, format!("ahk_id 0x{:x}", hwnd.0));
}

#[test]
fn test_stored_control_requires_a_match() {
    let mut script = script_with_notepad();
    let err = Control::new(&mut script, WindowSpec::title("no such window"), true).unwrap_err();
    match err {
        AhkError::WindowNotFound { title, .. } => assert_eq!(title, "no such window"),
        other => panic!("expected WindowNotFound, got {other:?}"),
    }
}

#[test]
fn test_send_to_missing_window_reports_failure() {
    let mut script = script_with_notepad();
    let ctl = Control::new(&mut script, WindowSpec::title("no such window"), false).unwrap();
    assert!(!ctl.send(&mut script, "Edit1", "hello").unwrap());
}

#[test]
fn test_command_runs_under_scoped_delay() {
    let mut script = script_with_notepad();
    let outer = script.engine_mut().get("A_ControlDelay").unwrap();

    let mut ctl = Control::new(&mut script, WindowSpec::title("Notepad"), false).unwrap();
    ctl.set_delay(50);
    assert!(ctl.send(&mut script, "Edit1", "abc").unwrap());

    // The command itself saw the override...
    let inputs = recorded_inputs(&mut script);
    assert_eq!(inputs[0].delay, "50");
    // ...and the engine-global value came back afterwards.
    assert_eq!(script.engine_mut().get("A_ControlDelay").unwrap(), outer);
    assert_eq!(outer, "20");
}
