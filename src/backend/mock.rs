//! Mock engine implementation.
//!
//! Emulates the embedded engine's observable protocol so the whole bridge
//! and proxy stack can be tested without the real dll, the same way the
//! DAQ-style mock hardware devices stand in for instruments. The emulation
//! covers exactly what crosses the bridge: case-insensitive textual
//! variables, `=` (literal) and `:=` (expression) assignments, labels,
//! function definitions with parameter-local scope, jump/call/post
//! semantics, line addresses, a handful of classic commands
//! (`ControlSend`, `ControlClick`, `PixelGetColor`, `SetControlDelay`,
//! `Sleep`) and a fake window registry plus screen map for the control and
//! pixel paths.
//!
//! Engine conventions preserved deliberately:
//!
//! - arithmetic on non-numeric text yields empty text, so typed converters
//!   downstream fail loudly instead of producing a garbage number;
//! - a missing variable reads as empty text;
//! - `jump` runs top-level statements from the label to the end of the
//!   loaded program (or a `return`).
//!
//! Readiness latency is configurable (`with_ready_after`) so the bounded
//! retry in `Ahk::ready` is actually exercised.

use super::{Addr, EngineBackend, ExecMode, StartOptions, WindowHandle, WindowSpec};
use crate::error::{AhkError, AhkResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

fn compiled(pattern: &str) -> Regex {
    // Patterns are compile-time constants; failure is a programming error.
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(pattern).unwrap();
    re
}

static FUNC_HEADER: Lazy<Regex> =
    Lazy::new(|| compiled(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*\{?$"));
static LABEL: Lazy<Regex> = Lazy::new(|| compiled(r"^([A-Za-z0-9_]+):$"));
static ASSIGN_EXPR: Lazy<Regex> =
    Lazy::new(|| compiled(r"^([A-Za-z_][A-Za-z0-9_]*)\s*:=\s*(.*)$"));
static ASSIGN_LEGACY: Lazy<Regex> =
    Lazy::new(|| compiled(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=([^=].*)?$"));
static CALL_STMT: Lazy<Regex> =
    Lazy::new(|| compiled(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$"));

/// Kind of control-scoped input the mock recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// A `ControlSend`.
    Send,
    /// A `ControlClick`.
    Click,
}

/// One control-scoped input the mock observed, with the engine-global
/// control delay in effect at the moment it ran. Tests use the recorded
/// delay to verify the scoped-setting guard.
#[derive(Clone, Debug)]
pub struct ControlInput {
    /// Send or click.
    pub kind: InputKind,
    /// Target control match string (may be empty).
    pub control: String,
    /// Keystrokes sent (empty for clicks).
    pub keys: String,
    /// Title match string the command used.
    pub title: String,
    /// `A_ControlDelay` as text when the command ran.
    pub delay: String,
}

#[derive(Clone, Debug)]
enum Stmt {
    Label(String),
    Code(String),
}

#[derive(Clone, Debug)]
struct Line {
    addr: usize,
    stmt: Stmt,
}

#[derive(Clone, Debug)]
struct MockFunc {
    addr: usize,
    params: Vec<String>,
    body: Vec<String>,
}

#[derive(Clone, Debug)]
struct MockWindow {
    hwnd: u64,
    title: String,
    text: String,
}

enum Flow {
    Normal,
    Return(String),
}

// Engine value classes as the expression evaluator sees them. Text is the
// ground truth; numbers are a view over it.
#[derive(Clone, Debug)]
enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Empty,
}

impl Value {
    fn classify(text: &str) -> Value {
        if text.is_empty() {
            return Value::Empty;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(text.to_string())
    }

    fn to_text(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Empty => String::new(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }
}

/// In-process stand-in for the embedded engine.
pub struct MockEngine {
    started: bool,
    ready_latency: u32,
    ready_in: u32,
    vars: HashMap<String, String>,
    program: Vec<Line>,
    funcs: HashMap<String, MockFunc>,
    windows: Vec<MockWindow>,
    active: Option<u64>,
    screen: HashMap<(i64, i64), String>,
    inputs: Vec<ControlInput>,
    current: Addr,
    next_addr: usize,
    next_hwnd: u64,
}

impl MockEngine {
    /// New mock with one failed readiness poll before reporting ready,
    /// enough to exercise the retry path without slowing tests down.
    pub fn new() -> Self {
        Self {
            started: false,
            ready_latency: 1,
            ready_in: 0,
            vars: HashMap::new(),
            program: Vec::new(),
            funcs: HashMap::new(),
            windows: Vec::new(),
            active: None,
            screen: HashMap::new(),
            inputs: Vec::new(),
            current: Addr::NULL,
            next_addr: 1,
            next_hwnd: 0x1000,
        }
    }

    /// Mock that reports ready only after `polls` failed readiness probes.
    pub fn with_ready_after(polls: u32) -> Self {
        Self {
            ready_latency: polls,
            ..Self::new()
        }
    }

    /// Register a fake window the control path can resolve.
    pub fn add_window(&mut self, title: &str, text: &str) -> WindowHandle {
        let hwnd = self.next_hwnd;
        self.next_hwnd += 1;
        self.windows.push(MockWindow {
            hwnd,
            title: title.to_string(),
            text: text.to_string(),
        });
        WindowHandle(hwnd)
    }

    /// Mark a registered window as the active one, resolvable through the
    /// engine's `"A"` title convention.
    pub fn set_active_window(&mut self, hwnd: WindowHandle) {
        self.active = Some(hwnd.0);
    }

    /// Set the color `PixelGetColor` reports for a screen coordinate.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: &str) {
        self.screen.insert((x, y), color.to_string());
    }

    /// Control inputs observed so far, in dispatch order.
    pub fn inputs(&self) -> &[ControlInput] {
        &self.inputs
    }

    fn init_builtins(&mut self) {
        self.vars.clear();
        self.vars.insert("errorlevel".into(), "0".into());
        self.vars.insert("a_controldelay".into(), "20".into());
        self.vars.insert("clipboard".into(), String::new());
    }

    fn alloc_addr(&mut self) -> usize {
        let addr = self.next_addr;
        self.next_addr += 1;
        addr
    }

    fn read_var(&self, name: &str, locals: Option<&HashMap<String, String>>) -> String {
        let key = name.to_ascii_lowercase();
        if let Some(frame) = locals {
            if let Some(v) = frame.get(&key) {
                return v.clone();
            }
        }
        self.vars.get(&key).cloned().unwrap_or_default()
    }

    fn write_var(
        &mut self,
        name: &str,
        value: String,
        locals: Option<&mut HashMap<String, String>>,
    ) {
        let key = name.to_ascii_lowercase();
        if let Some(frame) = locals {
            if frame.contains_key(&key) {
                frame.insert(key, value);
                return;
            }
        }
        self.vars.insert(key, value);
    }

    // ------------------------------------------------------------------
    // Block parsing
    // ------------------------------------------------------------------

    /// Parse a code block into program lines and function definitions.
    /// Nothing is committed until the whole block parses; a malformed
    /// block leaves the program and function table untouched. Returns the
    /// address of the first entity added, plus the indices of the freshly
    /// appended top-level lines.
    fn ingest(&mut self, code: &str) -> AhkResult<(Addr, Vec<usize>)> {
        let mut first = Addr::NULL;
        let mut funcs: Vec<(String, MockFunc)> = Vec::new();
        let mut lines: Vec<Line> = Vec::new();

        let raw: Vec<&str> = code.lines().collect();
        let mut i = 0;
        while i < raw.len() {
            let line = strip_comment(raw[i]).trim().to_string();
            i += 1;
            if line.is_empty() {
                continue;
            }

            // A parenthesized line is a function definition only when its
            // body brace follows; otherwise it is a plain call statement.
            let next_nonempty = raw[i..]
                .iter()
                .map(|l| strip_comment(l).trim())
                .find(|l| !l.is_empty());
            let is_header = FUNC_HEADER.is_match(&line)
                && (line.ends_with('{') || next_nonempty == Some("{"));

            if is_header {
                let caps = match FUNC_HEADER.captures(&line) {
                    Some(caps) => caps,
                    None => continue,
                };
                let name = caps[1].to_ascii_lowercase();
                let params: Vec<String> = caps[2]
                    .split(',')
                    .map(|p| p.trim().to_ascii_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect();

                // Opening brace may sit on the header or the next line.
                if !line.ends_with('{') {
                    while i < raw.len() && strip_comment(raw[i]).trim().is_empty() {
                        i += 1;
                    }
                    if i >= raw.len() || strip_comment(raw[i]).trim() != "{" {
                        return Err(AhkError::Engine(format!(
                            "missing body for function '{name}'"
                        )));
                    }
                    i += 1;
                }

                let mut body = Vec::new();
                loop {
                    if i >= raw.len() {
                        return Err(AhkError::Engine(format!(
                            "unterminated function '{name}'"
                        )));
                    }
                    let body_line = strip_comment(raw[i]).trim().to_string();
                    i += 1;
                    if body_line == "}" {
                        break;
                    }
                    if !body_line.is_empty() {
                        body.push(body_line);
                    }
                }

                let addr = self.alloc_addr();
                if first.is_null() {
                    first = Addr(addr);
                }
                funcs.push((name, MockFunc { addr, params, body }));
                continue;
            }

            let addr = self.alloc_addr();
            if first.is_null() {
                first = Addr(addr);
            }
            let stmt = match LABEL.captures(&line) {
                Some(caps) => Stmt::Label(caps[1].to_ascii_lowercase()),
                None => Stmt::Code(line),
            };
            lines.push(Line { addr, stmt });
        }

        let base = self.program.len();
        let new_lines = (base..base + lines.len()).collect();
        for (name, func) in funcs {
            self.funcs.insert(name, func);
        }
        self.program.extend(lines);
        Ok((first, new_lines))
    }

    /// Run the top-level lines at the given program indices, stopping on a
    /// `return`.
    fn run_top_level(&mut self, indices: &[usize]) -> AhkResult<()> {
        for &idx in indices {
            let stmt = match &self.program[idx].stmt {
                Stmt::Label(_) => continue,
                Stmt::Code(code) => code.clone(),
            };
            if let Flow::Return(_) = self.run_stmt(&stmt, None)? {
                break;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statement execution
    // ------------------------------------------------------------------

    fn run_stmt(
        &mut self,
        stmt: &str,
        mut locals: Option<&mut HashMap<String, String>>,
    ) -> AhkResult<Flow> {
        let lower = stmt.to_ascii_lowercase();
        if lower == "return" {
            return Ok(Flow::Return(String::new()));
        }
        if let Some(rest) = lower.strip_prefix("return ") {
            // Re-slice the original to keep the expression's case.
            let expr = &stmt[stmt.len() - rest.len()..];
            let value = self.eval(expr, locals.as_deref())?;
            return Ok(Flow::Return(value.to_text()));
        }

        if let Some(caps) = ASSIGN_EXPR.captures(stmt) {
            let name = caps[1].to_string();
            let value = self.eval(&caps[2], locals.as_deref())?;
            self.write_var(&name, value.to_text(), locals.as_deref_mut());
            return Ok(Flow::Normal);
        }

        if let Some(caps) = ASSIGN_LEGACY.captures(stmt) {
            let name = caps[1].to_string();
            let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            self.write_var(&name, value.to_string(), locals.as_deref_mut());
            return Ok(Flow::Normal);
        }

        if let Some(caps) = CALL_STMT.captures(stmt) {
            let name = caps[1].to_string();
            let args = self.eval_arg_list(&caps[2], locals.as_deref())?;
            self.invoke(&name, &args)?;
            return Ok(Flow::Normal);
        }

        self.run_command(stmt)
    }

    /// Classic `Command, arg1, arg2, ...` statements.
    fn run_command(&mut self, stmt: &str) -> AhkResult<Flow> {
        let (word, rest) = match stmt.find([',', ' ']) {
            Some(pos) => {
                let (w, r) = stmt.split_at(pos);
                (w, r.trim_start_matches([',', ' ']).to_string())
            }
            None => (stmt, String::new()),
        };
        let args: Vec<String> = rest.split(',').map(|a| a.trim().to_string()).collect();
        let arg = |n: usize| args.get(n).cloned().unwrap_or_default();

        match word.to_ascii_lowercase().as_str() {
            "controlsend" | "controlclick" => {
                let kind = if word.eq_ignore_ascii_case("controlsend") {
                    InputKind::Send
                } else {
                    InputKind::Click
                };
                // ControlSend, control, keys, title, text, extitle, extext
                // ControlClick, control-or-pos, title, text
                let (control, keys, spec) = if kind == InputKind::Send {
                    (
                        arg(0),
                        arg(1),
                        WindowSpec {
                            title: arg(2),
                            text: arg(3),
                            exclude_title: arg(4),
                            exclude_text: arg(5),
                        },
                    )
                } else {
                    (
                        arg(0),
                        String::new(),
                        WindowSpec {
                            title: arg(1),
                            text: arg(2),
                            ..WindowSpec::default()
                        },
                    )
                };
                let found = self.resolve_window(&spec).is_some();
                let delay = self.read_var("A_ControlDelay", None);
                self.write_var("ErrorLevel", if found { "0" } else { "1" }.into(), None);
                if found {
                    self.inputs.push(ControlInput {
                        kind,
                        control,
                        keys,
                        title: spec.title,
                        delay,
                    });
                }
                Ok(Flow::Normal)
            }
            "pixelgetcolor" => {
                // PixelGetColor, OutVar, X, Y
                let out = arg(0);
                let x = arg(1).parse::<i64>().unwrap_or(0);
                let y = arg(2).parse::<i64>().unwrap_or(0);
                let color = self
                    .screen
                    .get(&(x, y))
                    .cloned()
                    .unwrap_or_else(|| "0x000000".to_string());
                self.write_var(&out, color, None);
                self.write_var("ErrorLevel", "0".into(), None);
                Ok(Flow::Normal)
            }
            "setcontroldelay" => {
                self.write_var("A_ControlDelay", arg(0), None);
                Ok(Flow::Normal)
            }
            // Timing commands are observable only through latency; the mock
            // skips the wait.
            "sleep" => Ok(Flow::Normal),
            other => Err(AhkError::Engine(format!("unknown statement '{other}'"))),
        }
    }

    fn invoke(&mut self, name: &str, args: &[String]) -> AhkResult<Option<String>> {
        let func = match self.funcs.get(&name.to_ascii_lowercase()) {
            Some(f) => f.clone(),
            None => return Ok(None),
        };
        let mut frame: HashMap<String, String> = HashMap::new();
        for (i, param) in func.params.iter().enumerate() {
            frame.insert(param.clone(), args.get(i).cloned().unwrap_or_default());
        }
        for stmt in &func.body {
            if let Flow::Return(value) = self.run_stmt(stmt, Some(&mut frame))? {
                return Ok(Some(value));
            }
        }
        Ok(Some(String::new()))
    }

    // ------------------------------------------------------------------
    // Expression evaluation
    // ------------------------------------------------------------------

    fn eval(&mut self, src: &str, locals: Option<&HashMap<String, String>>) -> AhkResult<Value> {
        let tokens = lex(src)?;
        let mut parser = Parser { tokens, pos: 0 };
        let value = self.parse_sum(&mut parser, locals)?;
        if parser.pos != parser.tokens.len() {
            return Err(AhkError::Engine(format!("trailing input in '{src}'")));
        }
        Ok(value)
    }

    fn eval_arg_list(
        &mut self,
        src: &str,
        locals: Option<&HashMap<String, String>>,
    ) -> AhkResult<Vec<String>> {
        let src = src.trim();
        if src.is_empty() {
            return Ok(Vec::new());
        }
        src.split(',')
            .map(|part| Ok(self.eval(part.trim(), locals)?.to_text()))
            .collect()
    }

    fn parse_sum(
        &mut self,
        p: &mut Parser,
        locals: Option<&HashMap<String, String>>,
    ) -> AhkResult<Value> {
        let mut left = self.parse_product(p, locals)?;
        while let Some(op) = p.peek_op(&['+', '-']) {
            p.pos += 1;
            let right = self.parse_product(p, locals)?;
            left = arith(op, &left, &right);
        }
        Ok(left)
    }

    fn parse_product(
        &mut self,
        p: &mut Parser,
        locals: Option<&HashMap<String, String>>,
    ) -> AhkResult<Value> {
        let mut left = self.parse_atom(p, locals)?;
        while let Some(op) = p.peek_op(&['*', '/']) {
            p.pos += 1;
            let right = self.parse_atom(p, locals)?;
            left = arith(op, &left, &right);
        }
        Ok(left)
    }

    fn parse_atom(
        &mut self,
        p: &mut Parser,
        locals: Option<&HashMap<String, String>>,
    ) -> AhkResult<Value> {
        let token = match p.tokens.get(p.pos).cloned() {
            Some(t) => t,
            None => return Err(AhkError::Engine("unexpected end of expression".into())),
        };
        p.pos += 1;
        match token {
            Token::Num(text) => Ok(Value::classify(&text)),
            Token::Str(text) => Ok(Value::Str(text)),
            Token::Op('-') => {
                let inner = self.parse_atom(p, locals)?;
                Ok(match inner {
                    Value::Int(i) => Value::Int(-i),
                    Value::Float(f) => Value::Float(-f),
                    _ => Value::Empty,
                })
            }
            Token::Op('(') => {
                let inner = self.parse_sum(p, locals)?;
                p.expect_op(')')?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if p.peek_op(&['(']).is_some() {
                    p.pos += 1;
                    let mut args = Vec::new();
                    if p.peek_op(&[')']).is_none() {
                        loop {
                            args.push(self.parse_sum(p, locals)?.to_text());
                            if p.peek_op(&[',']).is_some() {
                                p.pos += 1;
                                continue;
                            }
                            break;
                        }
                    }
                    p.expect_op(')')?;
                    let result = self.invoke(&name, &args)?.unwrap_or_default();
                    Ok(Value::classify(&result))
                } else {
                    Ok(Value::classify(&self.read_var(&name, locals)))
                }
            }
            Token::Op(op) => Err(AhkError::Engine(format!("unexpected operator '{op}'"))),
        }
    }

    fn resolve_window(&self, spec: &WindowSpec) -> Option<WindowHandle> {
        let title = spec.title.trim();
        // "A" is the engine's name for the currently active window.
        if title == "A" {
            return self.active.map(WindowHandle);
        }
        if let Some(rest) = title
            .strip_prefix("ahk_id")
            .or_else(|| title.strip_prefix("AHK_ID"))
        {
            let rest = rest.trim();
            let hwnd = rest
                .strip_prefix("0x")
                .or_else(|| rest.strip_prefix("0X"))
                .and_then(|h| u64::from_str_radix(h, 16).ok())
                .or_else(|| rest.parse::<u64>().ok())?;
            return self
                .windows
                .iter()
                .find(|w| w.hwnd == hwnd)
                .map(|w| WindowHandle(w.hwnd));
        }
        self.windows
            .iter()
            .find(|w| {
                w.title.contains(title)
                    && w.text.contains(spec.text.trim())
                    && (spec.exclude_title.trim().is_empty()
                        || !w.title.contains(spec.exclude_title.trim()))
                    && (spec.exclude_text.trim().is_empty()
                        || !w.text.contains(spec.exclude_text.trim()))
            })
            .map(|w| WindowHandle(w.hwnd))
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

// AHK v1 arithmetic: numbers compute, anything else collapses to empty
// text. Integer division stays integral only when exact.
fn arith(op: char, left: &Value, right: &Value) -> Value {
    let (l, r) = match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Value::Empty,
    };
    let ints = left.is_int() && right.is_int();
    let result = match op {
        '+' => l + r,
        '-' => l - r,
        '*' => l * r,
        '/' => {
            if r == 0.0 {
                return Value::Empty;
            }
            l / r
        }
        _ => return Value::Empty,
    };
    if ints && result.fract() == 0.0 {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

#[derive(Clone, Debug)]
enum Token {
    Num(String),
    Str(String),
    Ident(String),
    Op(char),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self, ops: &[char]) -> Option<char> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(c)) if ops.contains(c) => Some(*c),
            _ => None,
        }
    }

    fn expect_op(&mut self, op: char) -> AhkResult<()> {
        if self.peek_op(&[op]).is_some() {
            self.pos += 1;
            Ok(())
        } else {
            Err(AhkError::Engine(format!("expected '{op}'")))
        }
    }
}

fn lex(src: &str) -> AhkResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Num(chars[start..i].iter().collect()));
        } else if c == '"' {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(AhkError::Engine("unterminated string literal".into()));
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if "+-*/(),".contains(c) {
            tokens.push(Token::Op(c));
            i += 1;
        } else {
            return Err(AhkError::Engine(format!("unexpected character '{c}'")));
        }
    }
    Ok(tokens)
}

impl EngineBackend for MockEngine {
    fn start(&mut self, _options: &StartOptions) -> AhkResult<()> {
        self.started = true;
        self.ready_in = self.ready_latency;
        self.program.clear();
        self.funcs.clear();
        self.current = Addr::NULL;
        self.init_builtins();
        Ok(())
    }

    fn ready(&mut self) -> bool {
        if !self.started {
            return false;
        }
        if self.ready_in > 0 {
            self.ready_in -= 1;
            return false;
        }
        true
    }

    fn terminate(&mut self) -> AhkResult<()> {
        self.started = false;
        Ok(())
    }

    fn reload(&mut self) -> AhkResult<()> {
        // Code and variables are wiped; the window registry and screen map
        // model the surrounding environment, which survives a reload.
        self.program.clear();
        self.funcs.clear();
        self.current = Addr::NULL;
        self.init_builtins();
        Ok(())
    }

    fn set_var(&mut self, name: &str, value: &str) -> AhkResult<bool> {
        self.write_var(name, value.to_string(), None);
        Ok(true)
    }

    fn get_var(&mut self, name: &str) -> AhkResult<String> {
        Ok(self.read_var(name, None))
    }

    fn exec(&mut self, code: &str) -> AhkResult<bool> {
        // Ad-hoc snippets run in a throwaway program slice; function
        // definitions stick, top-level lines do not.
        let before = self.program.len();
        let (_, new_lines) = match self.ingest(code) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("mock exec rejected: {e}");
                return Ok(false);
            }
        };
        let result = self.run_top_level(&new_lines);
        self.program.truncate(before);
        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("mock exec failed: {e}");
                Ok(false)
            }
        }
    }

    fn add_lines(&mut self, code: &str, execute: bool) -> AhkResult<Addr> {
        let (first, new_lines) = self.ingest(code)?;
        if execute {
            self.run_top_level(&new_lines)?;
            self.current = Addr::NULL;
        } else if !first.is_null() {
            // Execution now sits at the first injected line.
            self.current = first;
        }
        Ok(first)
    }

    fn jump(&mut self, label: &str) -> AhkResult<bool> {
        let key = label.to_ascii_lowercase();
        let start = self.program.iter().position(
            |line| matches!(&line.stmt, Stmt::Label(name) if *name == key),
        );
        let start = match start {
            Some(idx) => idx + 1,
            None => return Ok(false),
        };
        let indices: Vec<usize> = (start..self.program.len()).collect();
        self.run_top_level(&indices)?;
        self.current = Addr::NULL;
        Ok(true)
    }

    fn call(&mut self, name: &str, args: &[String]) -> AhkResult<String> {
        match self.invoke(name, args)? {
            Some(result) => Ok(result),
            None => {
                debug!("mock call to unknown function '{name}'");
                Ok(String::new())
            }
        }
    }

    fn post(&mut self, name: &str, args: &[String]) -> AhkResult<bool> {
        // The mock has no engine thread to hand off to, so dispatch and
        // completion coincide; the contract reported to callers is still
        // only "found and dispatched".
        Ok(self.invoke(name, args)?.is_some())
    }

    fn find_func(&mut self, name: &str) -> AhkResult<Addr> {
        Ok(self
            .funcs
            .get(&name.to_ascii_lowercase())
            .map(|f| Addr(f.addr))
            .unwrap_or(Addr::NULL))
    }

    fn find_label(&mut self, name: &str) -> AhkResult<Addr> {
        let key = name.to_ascii_lowercase();
        Ok(self
            .program
            .iter()
            .find(|line| matches!(&line.stmt, Stmt::Label(n) if *n == key))
            .map(|line| Addr(line.addr))
            .unwrap_or(Addr::NULL))
    }

    fn exec_line(&mut self, addr: Addr, mode: ExecMode) -> AhkResult<Addr> {
        if mode == ExecMode::Query {
            // Query reports where execution sits; the addr argument is
            // not consulted.
            return Ok(self.current);
        }
        let idx = match self.program.iter().position(|line| line.addr == addr.0) {
            Some(idx) => idx,
            None => return Ok(Addr::NULL),
        };
        if let Stmt::Code(code) = self.program[idx].stmt.clone() {
            self.run_stmt(&code, None)?;
        }
        let next = self
            .program
            .get(idx + 1)
            .map(|line| Addr(line.addr))
            .unwrap_or(Addr::NULL);
        self.current = next;
        Ok(next)
    }

    fn find_window(&mut self, spec: &WindowSpec) -> AhkResult<Option<WindowHandle>> {
        Ok(self.resolve_window(spec))
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
