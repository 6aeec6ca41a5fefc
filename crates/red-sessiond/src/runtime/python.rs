//! Runtime collaborators backed by an installed interpreter.
//!
//! Each call runs the interpreter with the embedded helper script, passing
//! the effective search path through `PYTHONPATH` (and class paths through
//! `CLASSPATH`). The helper prints one reply line carrying a tagged value
//! encoding, decoded here into [`Value`].
//!
//! All functions in this module perform blocking I/O and should be
//! called via `spawn_blocking`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, trace, warn};

use red_core::{OpaqueKind, SearchPath, Value};

use super::{
    DocGenerator, LibraryResolver, ModuleResolver, NamedValues, RuntimeError, VariableStore,
    VersionReporter,
};

/// The helper script content, embedded at compile time.
const HELPER_SCRIPT: &str = include_str!("../../scripts/red_runtime.py");

/// Prefix of the helper's reply line on stdout.
const REPLY_MARKER: &str = "RED-REPLY:";

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HelperReply {
    Ok {
        #[serde(default)]
        value: Json,
    },
    Unsupported {
        message: String,
    },
    Error {
        traceback: String,
    },
}

/// Runtime reached through an interpreter executable.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    interpreter: String,
}

impl PythonRuntime {
    /// Creates a runtime driven by `interpreter` (a command name or path).
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Runs one helper command and returns its encoded value.
    fn call(&self, path: &SearchPath, command: &str, args: &[&OsStr]) -> Result<Json, RuntimeError> {
        let mut process = Command::new(&self.interpreter);
        process
            .arg("-c")
            .arg(HELPER_SCRIPT)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .env("PYTHONPATH", python_path_env(path)?);
        if !path.class_paths.is_empty() {
            process.env("CLASSPATH", join(&path.class_paths)?);
        }

        trace!(interpreter = %self.interpreter, command, "Running runtime helper");
        let output = process.output().map_err(|source| RuntimeError::Launch {
            interpreter: self.interpreter.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(reply) = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(REPLY_MARKER))
        else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::MalformedReply(format!(
                "helper '{command}' exited with {} without replying: {}",
                output.status,
                stderr.trim()
            )));
        };

        match serde_json::from_str::<HelperReply>(reply) {
            Ok(HelperReply::Ok { value }) => Ok(value),
            Ok(HelperReply::Unsupported { message }) => Err(RuntimeError::Unsupported(message)),
            Ok(HelperReply::Error { traceback }) => Err(RuntimeError::Failed(traceback)),
            Err(e) => Err(RuntimeError::MalformedReply(e.to_string())),
        }
    }

    fn call_text(&self, path: &SearchPath, command: &str, args: &[&OsStr]) -> Result<Option<String>, RuntimeError> {
        match decode_value(self.call(path, command, args)?)? {
            Value::None => Ok(None),
            other => into_text(other).map(Some),
        }
    }

    fn call_text_list(&self, path: &SearchPath, command: &str) -> Result<Vec<String>, RuntimeError> {
        match decode_value(self.call(path, command, &[])?)? {
            Value::List(items) | Value::Tuple(items) => items.into_iter().map(into_text).collect(),
            other => Err(RuntimeError::MalformedReply(format!(
                "expected list of text, found {other}"
            ))),
        }
    }

    fn call_named(&self, path: &SearchPath, command: &str, args: &[&OsStr]) -> Result<NamedValues, RuntimeError> {
        decode_named_values(self.call(path, command, args)?)
    }
}

impl ModuleResolver for PythonRuntime {
    fn search_paths(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError> {
        self.call_text_list(path, "search_paths")
    }

    fn module_path(&self, path: &SearchPath, module_name: &str) -> Result<Option<String>, RuntimeError> {
        self.call_text(path, "module_path", &[OsStr::new(module_name)])
    }

    fn run_module_path(&self, path: &SearchPath) -> Result<Option<String>, RuntimeError> {
        self.call_text(path, "run_module_path", &[])
    }
}

impl LibraryResolver for PythonRuntime {
    fn standard_library_names(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError> {
        self.call_text_list(path, "standard_library_names")
    }

    fn standard_library_path(&self, path: &SearchPath, name: &str) -> Result<Option<String>, RuntimeError> {
        self.call_text(path, "standard_library_path", &[OsStr::new(name)])
    }
}

impl VariableStore for PythonRuntime {
    fn load(&self, path: &SearchPath, source: &Path, arguments: &[String]) -> Result<NamedValues, RuntimeError> {
        let mut args: Vec<&OsStr> = vec![source.as_os_str()];
        args.extend(arguments.iter().map(OsStr::new));
        self.call_named(path, "variables", &args)
    }

    fn legacy_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError> {
        self.call_named(path, "globals_legacy", &[])
    }

    fn scoped_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError> {
        self.call_named(path, "globals_scoped", &[])
    }
}

impl DocGenerator for PythonRuntime {
    fn generate(&self, path: &SearchPath, library_name: &str, output: &Path) -> Result<(), RuntimeError> {
        self.call(path, "libdoc", &[OsStr::new(library_name), output.as_os_str()])?;
        debug!(library = library_name, output = %output.display(), "Library documentation generated");
        Ok(())
    }
}

impl VersionReporter for PythonRuntime {
    fn full_version(&self) -> Option<String> {
        self.call_text(&SearchPath::default(), "version", &[])
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cannot query runtime version");
                None
            })
    }

    fn interpreter_version(&self) -> Option<String> {
        self.call_text(&SearchPath::default(), "interpreter_version", &[])
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cannot query interpreter version");
                None
            })
    }
}

/// Builds `PYTHONPATH`: the search path first, then whatever the
/// environment already had.
fn python_path_env(path: &SearchPath) -> Result<OsString, RuntimeError> {
    let mut entries: Vec<PathBuf> = path.python_paths.clone();
    if let Some(existing) = env::var_os("PYTHONPATH") {
        entries.extend(env::split_paths(&existing).filter(|p| !p.as_os_str().is_empty()));
    }
    join(&entries)
}

fn join(paths: &[PathBuf]) -> Result<OsString, RuntimeError> {
    env::join_paths(paths).map_err(|e| RuntimeError::InvalidPath(e.to_string()))
}

fn unexpected(expected: &str, found: &Json) -> RuntimeError {
    RuntimeError::MalformedReply(format!("expected {expected}, found {found}"))
}

/// Reads a decoded reply as text. Byte strings, as legacy interpreters
/// return them, are decoded as lossy UTF-8.
pub(crate) fn into_text(value: Value) -> Result<String, RuntimeError> {
    match value {
        Value::Str(text) | Value::Unicode(text) => Ok(text),
        Value::Bytes(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        other => Err(RuntimeError::MalformedReply(format!(
            "expected text, found {other}"
        ))),
    }
}

/// Decodes `[[name, value], ...]` as produced by the helper.
pub(crate) fn decode_named_values(json: Json) -> Result<NamedValues, RuntimeError> {
    let Json::Array(pairs) = json else {
        return Err(unexpected("list of named values", &json));
    };
    pairs
        .into_iter()
        .map(|pair| match pair {
            Json::Array(mut parts) if parts.len() == 2 => {
                let value = decode_value(parts.pop().unwrap_or(Json::Null))?;
                match parts.pop() {
                    Some(Json::String(name)) => Ok((name, value)),
                    other => Err(unexpected("variable name", &other.unwrap_or(Json::Null))),
                }
            }
            other => Err(unexpected("[name, value] pair", &other)),
        })
        .collect()
}

/// Decodes one tagged value.
pub(crate) fn decode_value(json: Json) -> Result<Value, RuntimeError> {
    match json {
        Json::Null => Ok(Value::None),
        Json::Bool(flag) => Ok(Value::Bool(flag)),
        Json::Number(number) => {
            if let Some(small) = number.as_i64() {
                Ok(Value::Int(i128::from(small)))
            } else if let Some(unsigned) = number.as_u64() {
                Ok(Value::Int(i128::from(unsigned)))
            } else {
                Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Json::String(text) => Ok(Value::Str(text)),
        Json::Array(items) => items
            .into_iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Json::Object(mut object) => {
            let tag = match object.remove("t") {
                Some(Json::String(tag)) => tag,
                _ => return Err(unexpected("tagged value", &Json::Object(object))),
            };
            let payload = object.remove("v").unwrap_or(Json::Null);
            match tag.as_str() {
                "int" => decode_integer(payload),
                "float" => match payload {
                    Json::String(text) => Ok(Value::Float(text.parse().unwrap_or(f64::NAN))),
                    other => Err(unexpected("float text", &other)),
                },
                "unicode" => match payload {
                    Json::String(text) => Ok(Value::Unicode(text)),
                    other => Err(unexpected("text", &other)),
                },
                "bytes" => decode_bytes(payload),
                "tuple" => match decode_value(payload)? {
                    Value::List(items) => Ok(Value::Tuple(items)),
                    other => Err(RuntimeError::MalformedReply(format!(
                        "expected tuple items, found {other}"
                    ))),
                },
                "dict" => decode_entries(payload).map(Value::Dict),
                "dotdict" => decode_entries(payload).map(Value::OrderedDict),
                "opaque" => {
                    let name = match object.remove("name") {
                        Some(Json::String(name)) => name,
                        _ => String::new(),
                    };
                    let kind = match object.remove("kind") {
                        Some(Json::String(kind)) => match kind.as_str() {
                            "module" => OpaqueKind::Module,
                            "function" => OpaqueKind::Function,
                            "class" => OpaqueKind::Class,
                            _ => OpaqueKind::Object,
                        },
                        _ => OpaqueKind::Object,
                    };
                    Ok(Value::Opaque { kind, name })
                }
                other => Err(RuntimeError::MalformedReply(format!(
                    "unknown value tag '{other}'"
                ))),
            }
        }
    }
}

fn decode_integer(payload: Json) -> Result<Value, RuntimeError> {
    let Json::String(digits) = payload else {
        return Err(unexpected("integer digits", &payload));
    };
    if let Ok(number) = digits.parse::<i128>() {
        return Ok(Value::Int(number));
    }
    let unsigned = digits.strip_prefix('-').unwrap_or(&digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuntimeError::MalformedReply(format!(
            "invalid integer '{digits}'"
        )));
    }
    Ok(Value::Long(digits))
}

fn decode_bytes(payload: Json) -> Result<Value, RuntimeError> {
    let Json::Array(items) = payload else {
        return Err(unexpected("byte list", &payload));
    };
    items
        .into_iter()
        .map(|item| {
            item.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| unexpected("byte", &item))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Bytes)
}

fn decode_entries(payload: Json) -> Result<Vec<(Value, Value)>, RuntimeError> {
    let Json::Array(pairs) = payload else {
        return Err(unexpected("entry list", &payload));
    };
    pairs
        .into_iter()
        .map(|pair| match pair {
            Json::Array(mut parts) if parts.len() == 2 => {
                let value = decode_value(parts.pop().unwrap_or(Json::Null))?;
                let key = decode_value(parts.pop().unwrap_or(Json::Null))?;
                Ok((key, value))
            }
            other => Err(unexpected("[key, value] pair", &other)),
        })
        .collect()
}
