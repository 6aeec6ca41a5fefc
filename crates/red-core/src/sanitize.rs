//! Conversion of arbitrary runtime values into wire-safe values.
//!
//! Values come from third-party scripts, so nothing about their shape can
//! be assumed. Rules, in precedence order:
//!
//! 1. Legacy wide-character text is NFKD-normalized and reduced to ASCII,
//!    dropping whatever cannot be encoded.
//! 2. Modern text is escaped so every code point survives as printable ASCII.
//! 3. Integers outside the signed 32-bit range become their decimal text.
//! 4. Mappings are sanitized entry by entry; a composite key collapses the
//!    whole mapping to the fallback literal.
//! 5. Lists are sanitized element-wise.
//! 6. Tuples are flattened: each sanitized element is iterated and the
//!    pieces are concatenated. Escaped or normalized text iterates to its
//!    byte values; decimal text from rule 3 and the fallback literal
//!    iterate to one-character text.
//! 7. Everything else passes through when wire-safe.
//!
//! Text produced by rules 1-3 (and the fallback) is encoded text, which the
//! sanitizer leaves alone, so its output is stable under re-sanitizing.

use std::fmt::Write as _;

use unicode_normalization::UnicodeNormalization;

use crate::error::SanitizeError;
use crate::value::Value;

/// Literal substituted for a value whose sanitization failed.
pub const FALLBACK: &str = "None";

const WIRE_INT_MIN: i128 = i32::MIN as i128;
const WIRE_INT_MAX: i128 = i32::MAX as i128;

/// Returns the fallback literal as a wire value.
pub fn fallback() -> Value {
    Value::encoded(FALLBACK)
}

/// Sanitizes a value, substituting the fallback literal on failure.
///
/// Never fails.
pub fn sanitize(value: Value) -> Value {
    try_sanitize(value).unwrap_or_else(|_| fallback())
}

/// Sanitizes a value, reporting values that have no wire form.
pub fn try_sanitize(value: Value) -> Result<Value, SanitizeError> {
    match value {
        Value::Unicode(text) => Ok(Value::Bytes(normalize_to_ascii(&text))),
        Value::Str(text) => Ok(Value::Bytes(escape_unicode(&text).into_bytes())),
        Value::Long(digits) => Ok(Value::Bytes(digits.into_bytes())),
        Value::Int(number) if !(WIRE_INT_MIN..=WIRE_INT_MAX).contains(&number) => {
            Ok(Value::encoded(number.to_string()))
        }
        Value::Dict(entries) | Value::OrderedDict(entries) => sanitize_mapping(entries),
        Value::List(items) => items
            .into_iter()
            .map(try_sanitize)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Tuple(items) => flatten_tuple(items),
        Value::Opaque { kind, name } => Err(SanitizeError::Opaque { kind, name }),
        other => Ok(other),
    }
}

fn sanitize_mapping(entries: Vec<(Value, Value)>) -> Result<Value, SanitizeError> {
    let mut sanitized = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if key.is_composite() {
            return Ok(fallback());
        }
        sanitized.push((sanitize_key(key)?, try_sanitize(value)?));
    }
    Ok(Value::Dict(sanitized))
}

/// Keys always leave as encoded text.
fn sanitize_key(key: Value) -> Result<Value, SanitizeError> {
    match key {
        Value::Str(text) | Value::Unicode(text) => {
            Ok(Value::Bytes(escape_unicode(&text).into_bytes()))
        }
        Value::Bytes(bytes) => Ok(Value::Bytes(bytes)),
        Value::Opaque { kind, name } => Err(SanitizeError::Opaque { kind, name }),
        scalar => Ok(Value::Bytes(escape_unicode(&scalar.key_text()).into_bytes())),
    }
}

// Element-wise results are concatenated, not nested as for lists.
fn flatten_tuple(items: Vec<Value>) -> Result<Value, SanitizeError> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        let encoded_source = matches!(item, Value::Str(_) | Value::Unicode(_) | Value::Bytes(_));
        match try_sanitize(item)? {
            Value::List(elements) | Value::Tuple(elements) => flat.extend(elements),
            Value::Bytes(bytes) if encoded_source => {
                flat.extend(bytes.into_iter().map(|b| Value::Int(i128::from(b))))
            }
            Value::Bytes(bytes) => flat.extend(split_characters(&bytes)),
            Value::Dict(entries) | Value::OrderedDict(entries) => {
                flat.extend(entries.into_iter().map(|(key, _)| key))
            }
            other => {
                return Err(SanitizeError::NotIterable {
                    type_name: other.type_name(),
                })
            }
        }
    }
    Ok(Value::Tuple(flat))
}

/// Splits decimal text or the fallback literal into one-character text.
fn split_characters(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(bytes)
        .chars()
        .map(|c| Value::Str(c.to_string()))
        .collect()
}

/// Escapes text the way the runtime's `unicode_escape` codec does.
pub fn escape_unicode(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        let code = u32::from(c);
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            ' '..='~' => escaped.push(c),
            _ if code < 0x100 => {
                let _ = write!(escaped, "\\x{code:02x}");
            }
            _ if code < 0x10000 => {
                let _ = write!(escaped, "\\u{code:04x}");
            }
            _ => {
                let _ = write!(escaped, "\\U{code:08x}");
            }
        }
    }
    escaped
}

/// Compatibility-decomposes text and keeps only its ASCII characters.
pub fn normalize_to_ascii(text: &str) -> Vec<u8> {
    text.nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .into_bytes()
}
