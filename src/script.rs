//! Script-level proxy object over the bridge.
//!
//! [`Script`] owns an [`Ahk`] handle and exposes engine-side entities
//! through explicit registration instead of dynamic attributes: declare a
//! variable with [`Script::variable`] or a function with
//! [`Script::function`], then drive it through typed accessors. Names are
//! validated at declaration time against the proxy's own reserved surface
//! and the internal-use `_` prefix, before any engine interaction happens.
//!
//! Declared entities stay usable until the engine is reloaded; name-based
//! access keeps working across a reload (it round-trips by name on every
//! use), while address handles captured earlier do not.

use crate::backend::{EngineBackend, StartOptions, WindowHandle, WindowSpec};
use crate::bridge::{Ahk, EngineState};
use crate::error::{AhkError, AhkResult};
use crate::marshal::{Color, FromAhk, ToAhk};
use crate::poll::{wait_until, RetryPolicy};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::time::Duration;

/// Names colliding with the proxy's own surface; declaring them would
/// shadow host-object internals.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "script", "engine", "variable", "function", "bind_function", "get", "set", "call",
        "execute", "win_exist", "win_active", "get_pixel", "wait_pixel", "clipboard",
        "errorlevel",
    ]
    .into_iter()
    .collect()
});

// Internal scratch variable for pixel probes; the '_' prefix keeps it out
// of the user-declarable namespace.
const PIXEL_VAR: &str = "_rust_ahk_pixel";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntityKind {
    Variable,
    Function,
}

/// Host-side proxy for one engine-side scripted entity registry.
pub struct Script {
    ahk: Ahk,
    declared: HashMap<String, EntityKind>,
}

impl Script {
    /// Wrap an engine handle, starting the engine if necessary and waiting
    /// for readiness with the default retry budget.
    pub fn new(ahk: Ahk) -> AhkResult<Self> {
        Self::with_policy(ahk, &RetryPolicy::attempts(15))
    }

    /// As [`Script::new`], with an explicit readiness retry policy.
    pub fn with_policy(mut ahk: Ahk, policy: &RetryPolicy) -> AhkResult<Self> {
        if ahk.state() != EngineState::Started {
            ahk.start(&StartOptions::default())?;
        }
        if !ahk.ready(policy) {
            return Err(AhkError::NotReady("script initialization".to_string()));
        }
        Ok(Self {
            ahk,
            declared: HashMap::new(),
        })
    }

    /// Convenience constructor over a fresh mock backend, for tests.
    pub fn with_backend(backend: Box<dyn EngineBackend>) -> AhkResult<Self> {
        Self::new(Ahk::new(backend))
    }

    /// The underlying engine handle.
    pub fn engine_mut(&mut self) -> &mut Ahk {
        &mut self.ahk
    }

    /// Give the engine handle back, dropping the registry.
    pub fn into_engine(self) -> Ahk {
        self.ahk
    }

    fn validate_name(&self, name: &str) -> AhkResult<String> {
        let key = name.to_ascii_lowercase();
        if key.is_empty() || key.starts_with('_') || RESERVED.contains(key.as_str()) {
            return Err(AhkError::ReservedName(name.to_string()));
        }
        if self.declared.contains_key(&key) {
            return Err(AhkError::AlreadyDeclared(name.to_string()));
        }
        Ok(key)
    }

    fn require_declared(&self, name: &str, kind: EntityKind) -> AhkResult<()> {
        match self.declared.get(&name.to_ascii_lowercase()) {
            Some(k) if *k == kind => Ok(()),
            _ => Err(AhkError::Undeclared(name.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declare an engine-side variable and write its initial value.
    ///
    /// Fails with [`AhkError::ReservedName`] or
    /// [`AhkError::AlreadyDeclared`] before any engine interaction.
    pub fn variable(&mut self, name: &str, initial: &dyn ToAhk) -> AhkResult<()> {
        let key = self.validate_name(name)?;
        self.ahk.set(name, initial)?;
        debug!("declared variable '{key}'");
        self.declared.insert(key, EntityKind::Variable);
        Ok(())
    }

    /// Read a declared variable, parsing it into `T`. Every read is a
    /// fresh round trip through the bridge; nothing is cached host-side.
    pub fn get<T: FromAhk>(&mut self, name: &str) -> AhkResult<T> {
        self.require_declared(name, EntityKind::Variable)?;
        let text = self.ahk.get(name)?;
        T::from_ahk(&text)
    }

    /// Write a declared variable.
    pub fn set(&mut self, name: &str, value: &dyn ToAhk) -> AhkResult<bool> {
        self.require_declared(name, EntityKind::Variable)?;
        self.ahk.set(name, value)
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Declare an engine-side function with a source body, injecting
    /// `name(params) { body }` into the running engine, and return a typed
    /// callable proxy.
    pub fn function<T: FromAhk>(
        &mut self,
        name: &str,
        params: &str,
        body: &str,
    ) -> AhkResult<Function<T>> {
        let key = self.validate_name(name)?;
        let params = params.trim();
        let params = params
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .unwrap_or(params);
        let code = format!("{name}({params}) {{\n    {body}\n}}\n");
        self.ahk.add_lines(&code)?;
        debug!("declared function '{key}'");
        self.declared.insert(key, EntityKind::Function);
        Ok(Function::named(name))
    }

    /// Bind a typed proxy to a function the engine already knows, without
    /// injecting a body.
    pub fn bind_function<T: FromAhk>(&mut self, name: &str) -> AhkResult<Function<T>> {
        let key = self.validate_name(name)?;
        self.declared.insert(key, EntityKind::Function);
        Ok(Function::named(name))
    }

    /// Call a declared function, parsing the textual result into the
    /// proxy's declared return type.
    pub fn call<T: FromAhk>(&mut self, name: &str, args: &[&dyn ToAhk]) -> AhkResult<T> {
        self.require_declared(name, EntityKind::Function)?;
        let text = self.ahk.call(name, args)?;
        T::from_ahk(&text)
    }

    // ------------------------------------------------------------------
    // Windowing conveniences
    // ------------------------------------------------------------------

    /// Resolve a window spec, `None` when nothing matches.
    pub fn win_exist(&mut self, spec: &WindowSpec) -> AhkResult<Option<WindowHandle>> {
        self.ahk.find_window(spec)
    }

    /// Handle of the currently active window, if any.
    pub fn win_active(&mut self) -> AhkResult<Option<WindowHandle>> {
        self.ahk.find_window(&WindowSpec::title("A"))
    }

    /// Sample the screen color at `(x, y)`.
    pub fn get_pixel(&mut self, x: i64, y: i64) -> AhkResult<Color> {
        let accepted = self
            .ahk
            .execute(&format!("PixelGetColor, {PIXEL_VAR}, {x}, {y}"))?;
        if !accepted {
            return Err(AhkError::Engine(format!(
                "pixel probe at ({x}, {y}) rejected"
            )));
        }
        let text = self.ahk.get(PIXEL_VAR)?;
        Color::from_ahk(&text)
    }

    /// Repeatedly sample the pixel at `(x, y)` until it comes within
    /// `threshold` (fractional color distance) of `target`, or, with no
    /// target, until it has diverged from the first sample by more than
    /// `threshold`. Bounded by `max_samples`; exhaustion yields
    /// [`AhkError::PollTimeout`].
    pub fn wait_pixel(
        &mut self,
        x: i64,
        y: i64,
        target: Option<Color>,
        threshold: f64,
        interval: Duration,
        max_samples: u32,
    ) -> AhkResult<Color> {
        match target {
            Some(target) => wait_until(
                || self.get_pixel(x, y),
                |c| c.distance(&target) <= threshold,
                interval,
                max_samples,
            ),
            None => {
                if max_samples == 0 {
                    return Err(AhkError::PollTimeout { attempts: 0 });
                }
                // First sample is the baseline; the rest of the budget
                // watches for divergence.
                let baseline = self.get_pixel(x, y)?;
                wait_until(
                    || self.get_pixel(x, y),
                    |c| c.distance(&baseline) > threshold,
                    interval,
                    max_samples - 1,
                )
                .map_err(|e| match e {
                    // The baseline sample counts against the caller's
                    // budget, so report the full figure.
                    AhkError::PollTimeout { .. } => AhkError::PollTimeout {
                        attempts: max_samples,
                    },
                    other => other,
                })
            }
        }
    }
}

/// Typed callable proxy for one engine-side function.
///
/// Created by [`Script::function`] / [`Script::bind_function`]; the type
/// parameter is the declared return converter. Each call marshals its
/// arguments to text, issues one synchronous bridge call, and parses the
/// textual result; a malformed result (including the empty text produced
/// by non-numeric arithmetic engine-side) surfaces as
/// [`AhkError::Conversion`].
pub struct Function<T> {
    name: String,
    _returns: PhantomData<fn() -> T>,
}

impl<T: FromAhk> Function<T> {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            _returns: PhantomData,
        }
    }

    /// Engine-side name of the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the engine-side function and parse its result.
    pub fn call(&self, script: &mut Script, args: &[&dyn ToAhk]) -> AhkResult<T> {
        let text = script.engine_mut().call(&self.name, args)?;
        T::from_ahk(&text)
    }
}
