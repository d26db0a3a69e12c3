//! Python executor backed by an embedded RustPython interpreter.
//!
//! One [`PythonRepl`] owns one interpreter and one namespace. Every command is
//! evaluated with that namespace as both globals and locals, so functions
//! defined in one call can see and call each other in later calls.

use std::collections::HashMap;

use rustpython_vm::{
    builtins::PyBaseExceptionRef,
    compiler::{CompileError, Mode},
    scope::Scope,
    AsObject, Interpreter, Settings, VirtualMachine,
};
use serde_json::{Map, Value};

use super::{
    capture::StdoutRedirect,
    convert::json_to_pyobject,
    ExecutionError, ExecutionResult,
};
use crate::{config::Config, utils::sanitize_input};

const SOURCE_PATH: &str = "<string>";

/// Native stack reserved per Python frame allowed by the recursion limit.
const STACK_BYTES_PER_FRAME: usize = 64 * 1024;
const MIN_STACK_BYTES: usize = 8 * 1024 * 1024;

/// Mock Python REPL: trusted code only, no isolation from the host.
pub struct PythonRepl {
    // Declared before `interpreter` so the namespace is dropped first.
    namespace: Scope,
    interpreter: Interpreter,
    sanitize: bool,
    stack_bytes: usize,
}

impl PythonRepl {
    pub fn new(config: &Config) -> Self {
        let interpreter = build_interpreter(config);
        let namespace = interpreter.enter(|vm| {
            let scope = vm.new_scope_with_builtins();
            let _ = scope
                .globals
                .set_item("__name__", vm.ctx.new_str("__main__").into(), vm);
            scope
        });
        Self {
            namespace,
            interpreter,
            sanitize: config.sanitize_input(),
            stack_bytes: config
                .recursion_limit()
                .saturating_mul(STACK_BYTES_PER_FRAME)
                .max(MIN_STACK_BYTES),
        }
    }

    /// Start with `namespace` already bound. Values that fail to convert are
    /// skipped with a warning.
    pub fn with_namespace(config: &Config, namespace: Map<String, Value>) -> Self {
        let mut repl = Self::new(config);
        for (name, value) in &namespace {
            if let Err(e) = repl.set(name, value) {
                tracing::warn!("skipping namespace entry '{}': {}", name, e);
            }
        }
        repl
    }

    /// Run `command` and return what it printed, or the error message if it
    /// failed. Never fails itself.
    pub fn run(&mut self, command: &str) -> String {
        self.evaluate(command, false).into_text()
    }

    /// Run `command` and report the full outcome, including output printed
    /// before a failure and the bindings left in the namespace.
    pub fn execute(&mut self, command: &str) -> ExecutionResult {
        self.evaluate(command, true)
    }

    /// Bind `name` to a JSON value converted to its Python counterpart.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), ExecutionError> {
        let globals = &self.namespace.globals;
        self.enter(|vm| {
            json_to_pyobject(value, vm)
                .and_then(|obj| globals.set_item(name, obj, vm))
                .map_err(|exc| runtime_error(vm, exc))
        })
    }

    /// `repr` of the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        let globals = &self.namespace.globals;
        self.enter(|vm| {
            let _redirect = StdoutRedirect::install(vm).ok()?;
            let value = globals.get_item_opt(name, vm).ok()??;
            value.repr(vm).ok().map(|s| s.as_str().to_owned())
        })
    }

    /// `repr` of every binding whose name does not start with `__`.
    pub fn variables(&self) -> HashMap<String, String> {
        let namespace = &self.namespace;
        self.enter(|vm| match StdoutRedirect::install(vm) {
            Ok(_redirect) => collect_variables(vm, namespace),
            Err(_) => HashMap::new(),
        })
    }

    fn evaluate(&mut self, command: &str, with_variables: bool) -> ExecutionResult {
        let source = if self.sanitize {
            sanitize_input(command)
        } else {
            command.to_owned()
        };
        let namespace = &self.namespace;

        let (output, outcome, variables) = self.enter(|vm| {
            let redirect = match StdoutRedirect::install(vm) {
                Ok(redirect) => redirect,
                Err(exc) => return (String::new(), Err(runtime_error(vm, exc)), HashMap::new()),
            };

            let outcome = vm
                .compile(&source, Mode::Exec, SOURCE_PATH.to_owned())
                .map_err(syntax_error)
                .and_then(|code| {
                    vm.run_code_obj(code, namespace.clone())
                        .map(drop)
                        .map_err(|exc| runtime_error(vm, exc))
                });
            let variables = if with_variables {
                collect_variables(vm, namespace)
            } else {
                HashMap::new()
            };

            let output = redirect.captured();
            drop(redirect);
            (output, outcome, variables)
        });

        tracing::debug!(
            "executed {} bytes of python: {}",
            source.len(),
            match &outcome {
                Ok(()) => "ok".to_owned(),
                Err(e) => format!("error: {e}"),
            }
        );

        match outcome {
            Ok(()) => ExecutionResult {
                success: true,
                output,
                errors: vec![],
                variables,
                error: None,
            },
            Err(err) => ExecutionResult {
                success: false,
                output,
                errors: vec![err.to_string()],
                variables,
                error: Some(err),
            },
        }
    }

    /// Enter the interpreter on a stack deep enough for the recursion limit,
    /// whatever thread the caller is on.
    fn enter<R>(&self, f: impl FnOnce(&VirtualMachine) -> R) -> R {
        stacker::grow(self.stack_bytes, || self.interpreter.enter(f))
    }
}

impl Default for PythonRepl {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

fn build_interpreter(config: &Config) -> Interpreter {
    let mut settings = Settings::default();
    settings.path_list.extend(config.stdlib_paths());
    settings.allow_external_library = true;
    let recursion_limit = config.recursion_limit();

    Interpreter::with_init(settings, move |vm| {
        vm.add_native_modules(rustpython_stdlib::get_module_inits());
        vm.recursion_limit.set(recursion_limit);
    })
}

fn collect_variables(vm: &VirtualMachine, namespace: &Scope) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for (key, value) in &namespace.globals {
        let Ok(name) = key.str(vm) else { continue };
        let name = name.as_str();
        if name.starts_with("__") {
            continue;
        }
        if let Ok(repr) = value.repr(vm) {
            vars.insert(name.to_owned(), repr.as_str().to_owned());
        }
    }
    vars
}

fn syntax_error(err: CompileError) -> ExecutionError {
    let (line, col) = err.python_location();
    ExecutionError::Syntax {
        message: err.to_string(),
        line: line as u32,
        col: col as u32,
    }
}

fn runtime_error(vm: &VirtualMachine, exc: PyBaseExceptionRef) -> ExecutionError {
    let message = exc
        .as_object()
        .str(vm)
        .map(|s| s.as_str().to_owned())
        .unwrap_or_else(|_| "unknown error".to_owned());

    let mut traceback = String::new();
    let _ = vm.write_exception(&mut traceback, &exc);

    ExecutionError::Runtime { message, traceback }
}
