//! Integration tests for the engine handle and command surface, driven
//! through the mock backend.

use rust_ahk::{
    Addr, Ahk, AhkError, EngineState, ExecMode, MockEngine, RetryPolicy, StartOptions, ToAhk,
};
use std::io::Write;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn started() -> Ahk {
    let mut ahk = Ahk::new(Box::new(MockEngine::new()));
    ahk.start(&StartOptions::default()).unwrap();
    assert!(ahk.ready(&retry(15)));
    ahk
}

fn retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts: attempts,
        delay: Duration::from_millis(1),
    }
}

#[test]
fn ready_reflects_lifecycle() {
    init_logging();
    let mut ahk = Ahk::new(Box::new(MockEngine::new()));

    // Unstarted engine never reports ready, with or without retries.
    assert!(!ahk.ready(&RetryPolicy::nowait()));
    assert!(!ahk.ready(&retry(5)));

    ahk.start(&StartOptions::default()).unwrap();
    assert!(ahk.ready(&retry(15)));
    assert!(ahk.ready(&RetryPolicy::nowait()));

    ahk.terminate().unwrap();
    assert!(!ahk.ready(&RetryPolicy::nowait()));
    assert_eq!(ahk.state(), EngineState::Terminated);
}

#[test]
fn commands_before_start_are_state_errors() {
    init_logging();
    let mut ahk = Ahk::new(Box::new(MockEngine::new()));
    assert!(matches!(ahk.get("test"), Err(AhkError::NotReady(_))));

    ahk.start(&StartOptions::default()).unwrap();
    ahk.terminate().unwrap();
    assert!(matches!(ahk.set("test", &1), Err(AhkError::NotReady(_))));
    assert!(matches!(ahk.jump("lbl"), Err(AhkError::NotReady(_))));
}

#[test]
fn set_get_round_trips_text_form() {
    init_logging();
    let mut ahk = started();
    let values: [&dyn ToAhk; 7] = [
        &1,
        &5,
        &50,
        &500,
        &"abc",
        &"a longer string",
        &"a string with\nspecial characters!",
    ];
    for value in values {
        assert!(ahk.set("test", value).unwrap(), "set reported failure");
        assert_eq!(ahk.get("test").unwrap(), value.to_ahk());
    }

    // A variable never written reads as empty text, not an error.
    assert_eq!(ahk.get("nonexistent").unwrap(), "");
}

#[test]
fn execute_changes_engine_state() {
    init_logging();
    let mut ahk = started();
    assert!(ahk.set("test", &0).unwrap());
    assert!(ahk.execute("test := test+1").unwrap());
    assert_eq!(ahk.get("test").unwrap(), "1");
}

#[test]
fn add_lines_runs_injected_code() {
    init_logging();
    let mut ahk = started();
    assert_eq!(ahk.get("test").unwrap(), "", "residual data found");

    let addr = ahk.add_lines("test = 5\n").unwrap();
    assert!(!addr.is_null());
    assert_eq!(ahk.get("test").unwrap(), "5");
}

#[test]
fn add_file_defers_execution_to_exec_line() {
    init_logging();
    let mut ahk = started();
    ahk.set("test", &5).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "test := test+5").unwrap();

    let addr = ahk.add_file(file.path()).unwrap();
    assert!(!addr.is_null());
    assert_eq!(ahk.get("test").unwrap(), "5", "file executed on load");

    // Query mode reports the line without running it.
    assert_eq!(ahk.exec_line(addr, ExecMode::Query).unwrap(), addr);
    assert_eq!(ahk.get("test").unwrap(), "5");

    ahk.exec_line(addr, ExecMode::RunWait).unwrap();
    assert_eq!(ahk.get("test").unwrap(), "10");
}

#[test]
fn query_reports_current_line_not_the_argument() {
    init_logging();
    let mut ahk = started();
    ahk.set("test", &0).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "test := test+1\ntest := test+10").unwrap();
    let first = ahk.add_file(file.path()).unwrap();
    assert_eq!(ahk.exec_line(first, ExecMode::Query).unwrap(), first);

    let second = ahk.exec_line(first, ExecMode::RunWait).unwrap();
    assert_eq!(ahk.get("test").unwrap(), "1");
    assert_ne!(second, first);

    // Query reflects where execution sits; the addr argument changes
    // nothing.
    assert_eq!(ahk.exec_line(first, ExecMode::Query).unwrap(), second);
    assert_eq!(ahk.exec_line(second, ExecMode::Query).unwrap(), second);
}

#[test]
fn call_and_post_reject_more_than_ten_arguments() {
    init_logging();
    let mut ahk = started();
    ahk.add_lines("First(a) {\n    return a\n}\n").unwrap();

    let values: Vec<i64> = (0..11).collect();
    let args: Vec<&dyn ToAhk> = values.iter().map(|v| v as &dyn ToAhk).collect();
    assert!(matches!(
        ahk.call("First", &args),
        Err(AhkError::Engine(_))
    ));
    assert!(matches!(
        ahk.post("First", &args),
        Err(AhkError::Engine(_))
    ));

    // Exactly ten still goes through.
    assert_eq!(ahk.call("First", &args[..10]).unwrap(), "0");
}

#[test]
fn jump_regression_increments_by_five() {
    init_logging();
    let mut ahk = started();
    ahk.add_lines("test = 0\nlbl:\ntest := test+5").unwrap();
    assert_eq!(ahk.get("test").unwrap(), "5");

    assert!(ahk.jump("lbl").unwrap(), "label not found");
    assert_eq!(ahk.get("test").unwrap(), "10");

    for i in 0..8 {
        assert!(ahk.jump("lbl").unwrap(), "label not found");
        let expected = (15 + i * 5).to_string();
        assert_eq!(ahk.get("test").unwrap(), expected);
    }
    // 9 jumps plus the initial fall-through: 50.
    assert_eq!(ahk.get("test").unwrap(), "50");
}

#[test]
fn call_returns_function_result() {
    init_logging();
    let mut ahk = started();
    ahk.add_lines("Add(x, y) {\n    return (x + y)\n}\n").unwrap();
    let result = ahk.call("Add", &[&5, &5]).unwrap();
    assert_eq!(result.parse::<i64>().unwrap(), 10);
}

#[test]
fn post_reports_dispatch_not_completion() {
    init_logging();
    let mut ahk = started();
    assert!(
        !ahk.post("nonexistent", &[]).unwrap(),
        "success reported posting to non-existent function"
    );

    ahk.add_lines("changer() {\n    ErrorLevel = 1\n}\n").unwrap();
    ahk.set("ErrorLevel", &0).unwrap();
    assert!(ahk.post("changer", &[]).unwrap());
    assert_ne!(ahk.get("ErrorLevel").unwrap(), "0");
}

#[test]
fn reload_discards_injected_state() {
    init_logging();
    let mut ahk = started();
    ahk.add_lines("test = 5\n").unwrap();
    assert_eq!(ahk.get("test").unwrap(), "5");

    let label = ahk.find_label("lbl");
    assert!(label.unwrap().is_null());

    ahk.reload().unwrap();
    assert_eq!(ahk.get("test").unwrap(), "", "variable survived reload");
}

#[test]
fn find_func_and_find_label_use_null_sentinel() {
    init_logging();
    let mut ahk = started();
    assert_eq!(ahk.find_func("nonexist").unwrap(), Addr::NULL);
    assert_eq!(ahk.find_label("nonexist").unwrap(), Addr::NULL);

    ahk.add_lines("AddTwo(n) {\n    return n + 2\n}\n").unwrap();
    assert!(!ahk.find_func("AddTwo").unwrap().is_null());

    ahk.add_lines("test = 0\nlbl:\ntest := test+5").unwrap();
    assert!(!ahk.find_label("lbl").unwrap().is_null());

    // Address handles are invalidated by reload.
    ahk.reload().unwrap();
    assert_eq!(ahk.find_func("AddTwo").unwrap(), Addr::NULL);
    assert_eq!(ahk.find_label("lbl").unwrap(), Addr::NULL);
}
