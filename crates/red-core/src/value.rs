//! Runtime values as handed over by the test-automation runtime.
//!
//! `Value` mirrors the shapes a runtime script can produce. Only a subset
//! of it is wire-safe; see [`crate::sanitize`] for the conversion.

use std::fmt::{self, Write as _};

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Kind of an opaque runtime object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    Module,
    Function,
    Class,
    Object,
}

impl OpaqueKind {
    /// Returns the kind name used in renderings and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpaqueKind::Module => "module",
            OpaqueKind::Function => "function",
            OpaqueKind::Class => "class",
            OpaqueKind::Object => "object",
        }
    }

    /// Returns true for code definitions (module, function, class).
    ///
    /// Variable records never carry definitions; they are dropped rather
    /// than degraded to the fallback literal.
    pub fn is_definition(&self) -> bool {
        !matches!(self, OpaqueKind::Object)
    }
}

impl fmt::Display for OpaqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value produced by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i128),
    /// Arbitrary-precision integer, kept as its decimal digits
    Long(String),
    Float(f64),
    /// Modern (code point) text
    Str(String),
    /// Legacy wide-character text
    Unicode(String),
    /// Encoded text
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    /// Mapping whose key order is part of its meaning
    OrderedDict(Vec<(Value, Value)>),
    Opaque { kind: OpaqueKind, name: String },
}

impl Value {
    /// Creates a modern text value.
    pub fn text(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    /// Creates an encoded text value from ASCII-compatible text.
    pub fn encoded(text: impl Into<String>) -> Self {
        Value::Bytes(text.into().into_bytes())
    }

    /// Returns true for values that cannot serve as mapping keys on the wire.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) | Value::OrderedDict(_)
        )
    }

    /// Returns the runtime's name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Unicode(_) => "unicode",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::OrderedDict(_) => "DotDict",
            Value::Opaque { kind, .. } => kind.as_str(),
        }
    }

    /// Returns the text used for this value when it is a mapping key.
    pub fn key_text(&self) -> String {
        match self {
            Value::Str(text) | Value::Unicode(text) | Value::Long(text) => text.clone(),
            Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            other => other.to_string(),
        }
    }

    /// Writes the quoted form used for values nested in containers.
    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(text) | Value::Unicode(text) => {
                f.write_char('\'')?;
                for c in text.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('\'')
            }
            other => fmt::Display::fmt(other, f),
        }
    }
}

fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        item.fmt_repr(f)?;
    }
    Ok(())
}

fn fmt_entries(f: &mut fmt::Formatter<'_>, entries: &[(Value, Value)]) -> fmt::Result {
    f.write_char('{')?;
    for (index, (key, value)) in entries.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        key.fmt_repr(f)?;
        f.write_str(": ")?;
        value.fmt_repr(f)?;
    }
    f.write_char('}')
}

/// Renders values the way the runtime's own `str()` does.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(number) => write!(f, "{number}"),
            Value::Long(digits) => f.write_str(digits),
            Value::Float(number) if number.is_nan() => f.write_str("nan"),
            Value::Float(number) if number.is_infinite() => {
                f.write_str(if *number > 0.0 { "inf" } else { "-inf" })
            }
            Value::Float(number) if number.fract() == 0.0 => write!(f, "{number:.1}"),
            Value::Float(number) => write!(f, "{number}"),
            Value::Str(text) | Value::Unicode(text) => f.write_str(text),
            Value::Bytes(bytes) => {
                f.write_str("b'")?;
                for byte in bytes {
                    match byte {
                        b'\'' => f.write_str("\\'")?,
                        b'\\' => f.write_str("\\\\")?,
                        b' '..=b'~' => f.write_char(char::from(*byte))?,
                        other => write!(f, "\\x{other:02x}")?,
                    }
                }
                f.write_char('\'')
            }
            Value::List(items) => {
                f.write_char('[')?;
                fmt_items(f, items)?;
                f.write_char(']')
            }
            Value::Tuple(items) => {
                f.write_char('(')?;
                fmt_items(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Value::Dict(entries) | Value::OrderedDict(entries) => fmt_entries(f, entries),
            Value::Opaque { kind, name } => write!(f, "<{kind} '{name}'>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(flag) => serializer.serialize_bool(*flag),
            Value::Int(number) => {
                if let Ok(small) = i64::try_from(*number) {
                    serializer.serialize_i64(small)
                } else if let Ok(unsigned) = u64::try_from(*number) {
                    serializer.serialize_u64(unsigned)
                } else {
                    serializer.collect_str(number)
                }
            }
            Value::Long(digits) => serializer.serialize_str(digits),
            Value::Float(number) => serializer.serialize_f64(*number),
            Value::Str(text) | Value::Unicode(text) => serializer.serialize_str(text),
            Value::Bytes(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dict(entries) | Value::OrderedDict(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    if let Value::Opaque { kind, name } = key {
                        return Err(S::Error::custom(format!(
                            "cannot marshal {kind} object '{name}'"
                        )));
                    }
                    map.serialize_entry(&key.key_text(), value)?;
                }
                map.end()
            }
            Value::Opaque { kind, name } => Err(S::Error::custom(format!(
                "cannot marshal {kind} object '{name}'"
            ))),
        }
    }
}
