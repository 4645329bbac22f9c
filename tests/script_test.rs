//! Integration tests for the script proxy layer.

use rust_ahk::{
    Ahk, AhkError, Color, MockEngine, RetryPolicy, Script, StartOptions, WindowSpec,
};
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn script() -> Script {
    Script::with_backend(Box::new(MockEngine::new())).unwrap()
}

#[test]
fn script_initializes_engine() {
    init_logging();
    let mut script = script();
    assert!(script.engine_mut().ready(&RetryPolicy::nowait()));
    // Engine builtins are live without declaration at the bridge level.
    assert_eq!(script.engine_mut().get("ErrorLevel").unwrap(), "0");
}

#[test]
fn script_accepts_running_engine() {
    init_logging();
    let mut ahk = Ahk::new(Box::new(MockEngine::new()));
    ahk.start(&StartOptions::default()).unwrap();
    let mut script = Script::new(ahk).unwrap();
    assert!(script.engine_mut().ready(&RetryPolicy::nowait()));
}

#[test]
fn function_proxy_converts_results() {
    init_logging();
    let mut script = script();
    let add = script
        .function::<i64>("add", "(x, y)", "return x + y")
        .unwrap();

    let cases: [(&str, &str, i64); 5] = [
        ("1", "1", 2),
        ("2", "2", 4),
        ("3", "4", 7),
        ("10", "11", 21),
        ("100", "1000", 1100),
    ];
    for (x, y, expected) in cases {
        assert_eq!(add.call(&mut script, &[&x, &y]).unwrap(), expected);
    }
}

#[test]
fn function_proxy_conversion_failure_is_loud() {
    init_logging();
    let mut script = script();
    let add = script
        .function::<i64>("add", "(x, y)", "return x + y")
        .unwrap();
    let err = add.call(&mut script, &[&"abc", &"efg"]).unwrap_err();
    assert!(
        matches!(err, AhkError::Conversion { .. }),
        "expected conversion error, got {err:?}"
    );
}

#[test]
fn bind_function_attaches_to_existing_code() {
    init_logging();
    let mut script = script();
    // The function arrives outside the proxy's registry, straight through
    // the bridge.
    script
        .engine_mut()
        .add_lines("Triple(n) {\n    return n * 3\n}\n")
        .unwrap();

    let triple = script.bind_function::<i64>("Triple").unwrap();
    assert_eq!(triple.call(&mut script, &[&7i64]).unwrap(), 21);
    assert_eq!(script.call::<i64>("Triple", &[&4i64]).unwrap(), 12);

    // Binding a name the engine never saw: the call answers empty text,
    // which the typed proxy refuses to coerce.
    let ghost = script.bind_function::<i64>("ghost").unwrap();
    assert!(matches!(
        ghost.call(&mut script, &[]).unwrap_err(),
        AhkError::Conversion { .. }
    ));
}

#[test]
fn declarations_guard_reserved_names() {
    init_logging();
    let mut script = script();
    assert!(matches!(
        script.function::<String>("_badname", "()", "return 1"),
        Err(AhkError::ReservedName(_))
    ));
    assert!(matches!(
        script.function::<String>("function", "()", "return 1"),
        Err(AhkError::ReservedName(_))
    ));

    script
        .function::<i64>("add", "(x, y)", "return x + y")
        .unwrap();
    assert!(matches!(
        script.function::<i64>("add", "(x, y)", "return x + y"),
        Err(AhkError::AlreadyDeclared(_))
    ));
    assert!(matches!(
        script.variable("add", &1),
        Err(AhkError::AlreadyDeclared(_))
    ));
}

#[test]
fn variables_round_trip_and_see_engine_writes() {
    init_logging();
    let mut script = script();
    script.variable("test", &5i64).unwrap();
    assert_eq!(script.get::<i64>("test").unwrap(), 5);

    script.set("test", &10i64).unwrap();
    assert_eq!(script.get::<i64>("test").unwrap(), 10);

    // Modification from outside the proxy is observed on next read.
    assert!(script.engine_mut().execute("test := test+5").unwrap());
    assert_eq!(script.get::<i64>("test").unwrap(), 15);
}

#[test]
fn typed_reads_fail_on_malformed_text() {
    init_logging();
    let mut script = script();
    script.variable("test", &"not a number").unwrap();
    assert!(matches!(
        script.get::<i64>("test"),
        Err(AhkError::Conversion { .. })
    ));
    // The same text is still readable under its real type.
    assert_eq!(script.get::<String>("test").unwrap(), "not a number");
}

#[test]
fn win_exist_and_win_active() {
    init_logging();
    let mut mock = MockEngine::new();
    let hwnd = mock.add_window("Untitled - Notepad", "");
    mock.set_active_window(hwnd);
    let mut script = Script::with_backend(Box::new(mock)).unwrap();

    assert_eq!(
        script.win_exist(&WindowSpec::title("Notepad")).unwrap(),
        Some(hwnd)
    );
    assert!(script
        .win_exist(&WindowSpec::title("non-existent-window"))
        .unwrap()
        .is_none());
    assert_eq!(script.win_active().unwrap(), Some(hwnd));
}

#[test]
fn wait_pixel_target_mode_stops_within_threshold() {
    init_logging();
    let mut mock = MockEngine::new();
    // (11, 11, 11) sits within a 0.5% distance of the (10, 10, 10) target.
    mock.set_pixel(10, 10, "0x0B0B0B");
    let mut script = Script::with_backend(Box::new(mock)).unwrap();

    let found = script
        .wait_pixel(
            10,
            10,
            Some(Color::new(10, 10, 10)),
            0.005,
            Duration::from_millis(1),
            5,
        )
        .unwrap();
    assert_eq!(found, Color::new(11, 11, 11));
}

#[test]
fn wait_pixel_bound_is_enforced() {
    init_logging();
    let mut script = script();
    // Unset screen reads as black; the white target can never match.
    let err = script
        .wait_pixel(
            0,
            0,
            Some(Color::new(255, 255, 255)),
            0.005,
            Duration::ZERO,
            4,
        )
        .unwrap_err();
    assert!(matches!(err, AhkError::PollTimeout { attempts: 4 }));

    // Change mode over a static pixel also exhausts its budget; the
    // reported count includes the baseline sample.
    let err = script
        .wait_pixel(0, 0, None, 0.008, Duration::ZERO, 4)
        .unwrap_err();
    assert!(matches!(err, AhkError::PollTimeout { attempts: 4 }));
}
