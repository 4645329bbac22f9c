//! The engine handle and its synchronous command surface.
//!
//! [`Ahk`] owns one embedded engine instance through a boxed
//! [`EngineBackend`] and an explicit lifecycle state. Every command is a
//! blocking call on the calling thread; the handle never pipelines or
//! reorders, so commands are observed by the engine in issue order. `post`
//! is the one fire-and-forget exception: it returns once the call is
//! dispatched, not once it completes.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded --start()--> Started --terminate()--> Terminated
//!                          ^                          |
//!                          +---------start()----------+
//! ```
//!
//! Commands other than `start`/`ready` require the `Started` state and
//! fail with [`AhkError::NotReady`] otherwise: misuse is reported instead
//! of silently ignored, so state-machine bugs in the caller surface
//! immediately. `ready` with a retry budget is the only sanctioned way to
//! ride out the engine's startup latency.
//!
//! ## Concurrency
//!
//! The handle provides no internal locking: one caller drives it at a
//! time, and sharing across threads requires external mutual exclusion.

use crate::backend::{Addr, EngineBackend, ExecMode, StartOptions, WindowHandle, WindowSpec};
use crate::error::{AhkError, AhkResult};
use crate::marshal::ToAhk;
use crate::poll::{poll_until, RetryPolicy};
use log::{debug, info};
use std::path::Path;

/// Argument slots the engine's function-call surface exposes.
const MAX_CALL_ARGS: usize = 10;

/// Lifecycle state of one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Created but never started.
    Unloaded,
    /// `start` has been issued; commands are accepted.
    Started,
    /// `terminate` has been issued; only `start` is accepted.
    Terminated,
}

/// Handle owning the lifetime of one embedded engine instance.
pub struct Ahk {
    backend: Box<dyn EngineBackend>,
    state: EngineState,
}

impl Ahk {
    /// Wrap a backend in a fresh, unstarted handle.
    pub fn new(backend: Box<dyn EngineBackend>) -> Self {
        Self {
            backend,
            state: EngineState::Unloaded,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Direct backend access, for tests driving mock-specific setup.
    pub fn backend_mut(&mut self) -> &mut dyn EngineBackend {
        &mut *self.backend
    }

    fn check_arg_count(&self, name: &str, count: usize) -> AhkResult<()> {
        if count > MAX_CALL_ARGS {
            return Err(AhkError::Engine(format!(
                "'{name}' called with {count} arguments; the engine accepts at most {MAX_CALL_ARGS}"
            )));
        }
        Ok(())
    }

    fn require_started(&self, operation: &str) -> AhkResult<()> {
        if self.state != EngineState::Started {
            return Err(AhkError::NotReady(operation.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Launch the engine thread. Readiness is asynchronous: poll
    /// [`Ahk::ready`] before issuing commands. Starting twice without an
    /// intervening `terminate` is a caller error the engine does not
    /// guard against.
    pub fn start(&mut self, options: &StartOptions) -> AhkResult<()> {
        info!("starting engine");
        self.backend.start(options)?;
        self.state = EngineState::Started;
        Ok(())
    }

    /// Whether the engine is ready to accept commands, polling up to
    /// `policy.max_attempts` times with `policy.delay` between probes.
    /// Use [`RetryPolicy::nowait`] for a single non-blocking check.
    pub fn ready(&mut self, policy: &RetryPolicy) -> bool {
        if self.state != EngineState::Started {
            return false;
        }
        poll_until(policy, || self.backend.ready())
    }

    /// Request engine shutdown. Does not block until shutdown completes;
    /// callers wanting confirmation poll `ready(&RetryPolicy::nowait())`
    /// afterwards and expect `false`.
    pub fn terminate(&mut self) -> AhkResult<()> {
        self.require_started("terminate")?;
        info!("terminating engine");
        self.backend.terminate()?;
        self.state = EngineState::Terminated;
        Ok(())
    }

    /// Discard all injected code and variable state and restart from the
    /// original entry point. Every previously obtained [`Addr`] becomes
    /// stale.
    pub fn reload(&mut self) -> AhkResult<()> {
        self.require_started("reload")?;
        info!("reloading engine");
        self.backend.reload()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Serialize `value` to text and write it into the named variable.
    /// Returns whether the engine acknowledged the assignment.
    pub fn set(&mut self, name: &str, value: &dyn ToAhk) -> AhkResult<bool> {
        self.require_started("set")?;
        let text = value.to_ahk();
        debug!("set {name} = {text:?}");
        self.backend.set_var(name, &text)
    }

    /// Read the textual value of a variable. A non-existent variable reads
    /// as empty text, never an error.
    pub fn get(&mut self, name: &str) -> AhkResult<String> {
        self.require_started("get")?;
        let text = self.backend.get_var(name)?;
        debug!("get {name} -> {text:?}");
        Ok(text)
    }

    /// Run an ad-hoc snippet in the current execution context, waiting for
    /// completion. Returns whether the engine accepted it.
    pub fn execute(&mut self, code: &str) -> AhkResult<bool> {
        self.require_started("execute")?;
        debug!("execute {code:?}");
        self.backend.exec(code)
    }

    /// Inject a block of code into the running engine, executing its top
    /// level immediately, and return the address of the first injected
    /// line (usable later with [`Ahk::exec_line`]).
    pub fn add_lines(&mut self, code: &str) -> AhkResult<Addr> {
        self.require_started("add_lines")?;
        debug!("add_lines ({} bytes)", code.len());
        self.backend.add_lines(code, true)
    }

    /// Inject code read from a file, without executing it. The caller
    /// drives the injected lines with [`Ahk::exec_line`].
    pub fn add_file(&mut self, path: &Path) -> AhkResult<Addr> {
        self.require_started("add_file")?;
        debug!("add_file {}", path.display());
        let code = std::fs::read_to_string(path)?;
        self.backend.add_lines(&code, false)
    }

    /// Transfer the engine's execution point to a named label. Returns
    /// whether the label was found.
    pub fn jump(&mut self, label: &str) -> AhkResult<bool> {
        self.require_started("jump")?;
        debug!("jump {label}");
        self.backend.jump(label)
    }

    /// Invoke a named engine function synchronously with positional
    /// arguments and return its textual result. An unknown function yields
    /// empty text, the protocol's absence sentinel. The call surface
    /// carries at most ten arguments; more is an error.
    pub fn call(&mut self, name: &str, args: &[&dyn ToAhk]) -> AhkResult<String> {
        self.require_started("call")?;
        self.check_arg_count(name, args.len())?;
        let args: Vec<String> = args.iter().map(|a| a.to_ahk()).collect();
        debug!("call {name}({})", args.join(", "));
        self.backend.call(name, &args)
    }

    /// Invoke a named engine function without waiting for its result.
    /// Returns whether the function was found and the call dispatched,
    /// not whether it finished. The same ten-argument limit as
    /// [`Ahk::call`] applies.
    pub fn post(&mut self, name: &str, args: &[&dyn ToAhk]) -> AhkResult<bool> {
        self.require_started("post")?;
        self.check_arg_count(name, args.len())?;
        let args: Vec<String> = args.iter().map(|a| a.to_ahk()).collect();
        debug!("post {name}({})", args.join(", "));
        self.backend.post(name, &args)
    }

    /// Resolve a function name to an address handle, [`Addr::NULL`] if not
    /// found.
    pub fn find_func(&mut self, name: &str) -> AhkResult<Addr> {
        self.require_started("find_func")?;
        self.backend.find_func(name)
    }

    /// Resolve a label name to an address handle, [`Addr::NULL`] if not
    /// found.
    pub fn find_label(&mut self, name: &str) -> AhkResult<Addr> {
        self.require_started("find_label")?;
        self.backend.find_label(name)
    }

    /// Execute the single previously injected line at `addr` and return
    /// the address of the next line. [`ExecMode::Query`] executes nothing
    /// and reports the line the engine currently sits at, ignoring `addr`.
    pub fn exec_line(&mut self, addr: Addr, mode: ExecMode) -> AhkResult<Addr> {
        self.require_started("exec_line")?;
        debug!("exec_line {addr} ({mode:?})");
        self.backend.exec_line(addr, mode)
    }

    /// Resolve a window spec to a handle, `None` when nothing matches.
    pub fn find_window(&mut self, spec: &WindowSpec) -> AhkResult<Option<WindowHandle>> {
        self.require_started("find_window")?;
        self.backend.find_window(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockEngine;

    fn handle() -> Ahk {
        Ahk::new(Box::new(MockEngine::with_ready_after(0)))
    }

    #[test]
    fn test_commands_require_start() {
        let mut ahk = handle();
        assert!(matches!(ahk.get("test"), Err(AhkError::NotReady(_))));
        assert!(matches!(
            ahk.execute("x := 1"),
            Err(AhkError::NotReady(_))
        ));
        assert!(matches!(ahk.terminate(), Err(AhkError::NotReady(_))));
    }

    #[test]
    fn test_lifecycle_states() {
        let mut ahk = handle();
        assert_eq!(ahk.state(), EngineState::Unloaded);
        assert!(!ahk.ready(&RetryPolicy::nowait()));

        ahk.start(&StartOptions::default()).unwrap();
        assert_eq!(ahk.state(), EngineState::Started);
        assert!(ahk.ready(&RetryPolicy::attempts(15)));
        assert!(ahk.ready(&RetryPolicy::nowait()));

        ahk.terminate().unwrap();
        assert_eq!(ahk.state(), EngineState::Terminated);
        assert!(!ahk.ready(&RetryPolicy::nowait()));

        // Restart after terminate is allowed.
        ahk.start(&StartOptions::default()).unwrap();
        assert!(ahk.ready(&RetryPolicy::attempts(15)));
    }

    #[test]
    fn test_ready_respects_latency() {
        let mut ahk = Ahk::new(Box::new(MockEngine::with_ready_after(3)));
        ahk.start(&StartOptions::default()).unwrap();
        assert!(!ahk.ready(&RetryPolicy::nowait()));
        let policy = RetryPolicy {
            max_attempts: 15,
            delay: std::time::Duration::from_millis(1),
        };
        assert!(ahk.ready(&policy));
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut ahk = handle();
        ahk.start(&StartOptions::default()).unwrap();
        for value in ["1", "500", "abc", "a longer string"] {
            assert!(ahk.set("test", &value).unwrap());
            assert_eq!(ahk.get("test").unwrap(), value);
        }
        assert!(ahk.set("test", &42i64).unwrap());
        assert_eq!(ahk.get("test").unwrap(), "42");
    }
}
