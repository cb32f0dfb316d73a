//! Runs module source inside a throwaway ECMAScript engine.
//!
//! Every call gets a fresh [`boa_engine::Context`], which only carries the language's own
//! builtins: there is no `require`, `process`, filesystem or network, and nothing from one
//! evaluation is visible to the next. A small prelude adds CommonJS `module`/`exports` and a
//! `console` whose output goes to the log instead of stdout.

use crate::{config::SandboxLimits, value::ExportedValue};
use boa_engine::{
    builtins::promise::PromiseState, module::Module, Context, JsError, JsString, JsValue, Source,
};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EvaluateError {
    #[error("failed to compile module: {message}")]
    #[diagnostic(
        code(sassify::sandbox::compile),
        help("The module could not be parsed by the engine")
    )]
    Compile { message: String },

    #[error("failed to execute module: {reason}")]
    #[diagnostic(code(sassify::sandbox::execution))]
    Execution { reason: String },
}
impl EvaluateError {
    fn execution(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::error!("Failed to execute module: {reason}");
        Self::Execution { reason }
    }
}

/// Installs `module`, `exports` and `console`, and evaluates to the function that
/// serializes the export value once the module has run.
const PRELUDE: &str = r#"
(function (global) {
  var initial = {};
  var lines = [];
  global.module = { exports: initial };
  global.exports = initial;

  function writer(level) {
    return function () {
      lines.push([level, Array.prototype.map.call(arguments, String).join(" ")]);
    };
  }
  global.console = {
    log: writer("info"),
    info: writer("info"),
    debug: writer("debug"),
    warn: writer("warn"),
    error: writer("error")
  };

  function leaf(key, value) {
    if (value === undefined) return null;
    if (typeof value === "number" && !isFinite(value)) return String(value);
    if (typeof value === "function" || typeof value === "symbol" || typeof value === "bigint") {
      return String(value);
    }
    return value;
  }

  return function (namespace) {
    var exported = global.module.exports;
    var commonjs = exported !== initial || Object.keys(initial).length > 0;
    var value = commonjs ? exported : namespace;
    return JSON.stringify({ console: lines, value: value === undefined ? null : value }, leaf);
  };
})(globalThis)
"#;

#[derive(Deserialize)]
struct Evaluation {
    console: Vec<(String, String)>,
    value: serde_json::Value,
}

/// Evaluates modules under fixed [`SandboxLimits`].
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// Runs `script` as a module and returns its export value: `module.exports` when the
    /// module assigned or extended it, its namespace object otherwise.
    ///
    /// # Errors
    ///
    /// - [`EvaluateError::Compile`] when the module does not parse.
    /// - [`EvaluateError::Execution`] when it throws, imports another module, reads an
    ///   undefined variable, exceeds a limit, runs past the timeout, or crashes the engine.
    pub fn evaluate(&self, script: &str) -> Result<ExportedValue, EvaluateError> {
        let Some(timeout) = self.limits.timeout() else {
            return contain_panics(|| run_module(script, &self.limits));
        };

        let script = script.to_string();
        let limits = self.limits.clone();
        let (sender, receiver) = mpsc::channel();

        // the worker is left to run into its loop limit if it misses the deadline
        thread::Builder::new()
            .name("sassify-sandbox".to_string())
            .stack_size(16 * 1024 * 1024)
            .spawn(move || {
                let _ = sender.send(contain_panics(|| run_module(&script, &limits)));
            })
            .map_err(|error| EvaluateError::execution(format!("failed to start sandbox: {error}")))?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EvaluateError::execution(format!(
                "execution timed out after {}ms",
                timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(EvaluateError::execution("sandbox exited without a result"))
            }
        }
    }
}

fn contain_panics<F>(evaluate: F) -> Result<ExportedValue, EvaluateError>
where
    F: FnOnce() -> Result<ExportedValue, EvaluateError>,
{
    panic::catch_unwind(AssertUnwindSafe(evaluate)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());

        Err(EvaluateError::execution(format!("engine panicked: {message}")))
    })
}

fn run_module(script: &str, limits: &SandboxLimits) -> Result<ExportedValue, EvaluateError> {
    let mut context = Context::default();

    let runtime_limits = context.runtime_limits_mut();
    runtime_limits.set_loop_iteration_limit(limits.loop_iteration_limit);
    runtime_limits.set_recursion_limit(limits.recursion_limit);
    runtime_limits.set_stack_size_limit(limits.stack_size_limit);

    let serialize = context
        .eval(Source::from_bytes(PRELUDE))
        .map_err(|error| EvaluateError::execution(describe(error, &mut context)))?
        .as_callable()
        .cloned()
        .ok_or_else(|| EvaluateError::execution("prelude did not evaluate to a function"))?;

    let module = Module::parse(Source::from_bytes(script), None, &mut context).map_err(|error| {
        let message = describe(error, &mut context);
        log::error!("Failed to compile module: {message}");
        EvaluateError::Compile { message }
    })?;

    let promise = module.load_link_evaluate(&mut context);
    context.run_jobs();

    match promise.state() {
        PromiseState::Fulfilled(_) => {}
        PromiseState::Rejected(reason) => {
            let message = describe(JsError::from_opaque(reason), &mut context);
            return Err(EvaluateError::execution(message));
        }
        PromiseState::Pending => {
            return Err(EvaluateError::execution("module evaluation never settled"));
        }
    }

    let namespace = module.namespace(&mut context);

    let json = serialize
        .call(&JsValue::undefined(), &[namespace.into()], &mut context)
        .map_err(|error| EvaluateError::execution(describe(error, &mut context)))?;

    let json = json
        .as_string()
        .map(JsString::to_std_string_escaped)
        .ok_or_else(|| EvaluateError::execution("export value did not serialize"))?;

    let evaluation: Evaluation = serde_json::from_str(&json).map_err(|error| {
        EvaluateError::execution(format!("export value did not serialize: {error}"))
    })?;

    for (level, line) in evaluation.console {
        let level = match level.as_str() {
            "error" => log::Level::Error,
            "warn" => log::Level::Warn,
            "debug" => log::Level::Debug,
            _ => log::Level::Info,
        };
        log::log!(target: "sassify::sandbox", level, "{line}");
    }

    Ok(ExportedValue::from(evaluation.value))
}

fn describe(error: JsError, context: &mut Context) -> String {
    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}
