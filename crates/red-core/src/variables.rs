//! Variable records and their wire preparation.

use std::collections::HashMap;

use tracing::debug;

use crate::error::SanitizeError;
use crate::sanitize::{fallback, try_sanitize};
use crate::value::Value;

const VARIABLE_SIGILS: [&str; 3] = ["${", "@{", "&{"];

/// Mapping from decorated variable name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableRecord {
    entries: Vec<(String, Value)>,
    /// Position of each name in `entries`
    index: HashMap<String, usize>,
}

impl VariableRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable, replacing the value of an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self
            .index
            .get(&name)
            .and_then(|&position| self.entries.get_mut(position))
        {
            slot.1 = value;
            return;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index
            .get(name)
            .and_then(|&position| self.entries.get(position))
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the record into a mapping value keyed by variable name.
    pub fn into_value(self) -> Value {
        Value::Dict(
            self.entries
                .into_iter()
                .map(|(name, value)| (Value::Str(name), value))
                .collect(),
        )
    }
}

impl IntoIterator for VariableRecord {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for VariableRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Wraps a bare variable name as a scalar variable (`name` -> `${name}`).
pub fn decorate_variable_name(name: &str) -> String {
    if VARIABLE_SIGILS.iter().any(|sigil| name.starts_with(sigil)) {
        name.to_string()
    } else {
        format!("${{{name}}}")
    }
}

/// Prepares variables loaded from a source for the wire.
///
/// Module, function and class values are dropped. Ordered-key mappings keep
/// their keys and get their values sanitized. A field that fails to
/// sanitize is stored as the fallback literal; other fields are unaffected.
pub fn sanitize_variables<I>(variables: I) -> VariableRecord
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut record = VariableRecord::new();
    for (name, value) in variables {
        let sanitized = match value {
            Value::Opaque { kind, .. } if kind.is_definition() => {
                debug!(variable = %name, kind = %kind, "Skipping definition variable");
                continue;
            }
            Value::OrderedDict(entries) => extract_ordered_mapping(entries),
            other => try_sanitize(other),
        };
        let value = sanitized.unwrap_or_else(|error| {
            debug!(variable = %name, error = %error, "Variable degraded to fallback");
            fallback()
        });
        record.insert(name, value);
    }
    record
}

fn extract_ordered_mapping(entries: Vec<(Value, Value)>) -> Result<Value, SanitizeError> {
    entries
        .into_iter()
        .map(|(key, value)| Ok((key, try_sanitize(value)?)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Dict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OpaqueKind;

    fn names(record: &VariableRecord) -> Vec<String> {
        record.clone().into_iter().map(|(name, _)| name).collect()
    }

    fn opaque(kind: OpaqueKind) -> Value {
        Value::Opaque {
            kind,
            name: "thing".to_string(),
        }
    }

    #[test]
    fn test_decorate_variable_name() {
        assert_eq!(decorate_variable_name("TEMPDIR"), "${TEMPDIR}");
        assert_eq!(decorate_variable_name("${x}"), "${x}");
        assert_eq!(decorate_variable_name("@{list}"), "@{list}");
        assert_eq!(decorate_variable_name("&{dict}"), "&{dict}");
        assert_eq!(decorate_variable_name("%{ENV}"), "${%{ENV}}");
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = VariableRecord::new();
        record.insert("${a}", Value::Int(1));
        record.insert("${b}", Value::Int(2));
        record.insert("${a}", Value::Int(3));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("${a}"), Some(&Value::Int(3)));
        assert_eq!(names(&record), vec!["${a}", "${b}"]);
    }

    #[test]
    fn test_record_keeps_order_across_many_replacements() {
        let mut record = VariableRecord::new();
        for round in 0..3 {
            for n in 0..5_000 {
                record.insert(format!("${{v{n}}}"), Value::Int(round));
            }
        }
        assert_eq!(record.len(), 5_000);
        assert_eq!(record.get("${v0}"), Some(&Value::Int(2)));
        assert_eq!(record.get("${v4999}"), Some(&Value::Int(2)));
        assert_eq!(record.get("${v5000}"), None);
        let order = names(&record);
        assert_eq!(order.first().map(String::as_str), Some("${v0}"));
        assert_eq!(order.last().map(String::as_str), Some("${v4999}"));
    }

    #[test]
    fn test_definitions_are_dropped() {
        let record = sanitize_variables(vec![
            ("${module}".to_string(), opaque(OpaqueKind::Module)),
            ("${function}".to_string(), opaque(OpaqueKind::Function)),
            ("${class}".to_string(), opaque(OpaqueKind::Class)),
            ("${kept}".to_string(), Value::Int(1)),
        ]);
        assert_eq!(names(&record), vec!["${kept}"]);
    }

    #[test]
    fn test_failing_field_degrades_alone() {
        let record = sanitize_variables(vec![
            ("${object}".to_string(), opaque(OpaqueKind::Object)),
            ("${bad_tuple}".to_string(), Value::Tuple(vec![Value::Int(1)])),
            ("${text}".to_string(), Value::text("ok")),
        ]);
        assert_eq!(record.get("${object}"), Some(&fallback()));
        assert_eq!(record.get("${bad_tuple}"), Some(&fallback()));
        assert_eq!(record.get("${text}"), Some(&Value::encoded("ok")));
    }

    #[test]
    fn test_ordered_mapping_keeps_keys() {
        let record = sanitize_variables(vec![(
            "&{config}".to_string(),
            Value::OrderedDict(vec![
                (Value::text("zł"), Value::text("ą")),
                (Value::text("n"), Value::Int(1 << 33)),
            ]),
        )]);
        assert_eq!(
            record.get("&{config}"),
            Some(&Value::Dict(vec![
                (Value::text("zł"), Value::encoded("\\u0105")),
                (Value::text("n"), Value::encoded((1_i128 << 33).to_string())),
            ]))
        );
    }

    #[test]
    fn test_into_value() {
        let record: VariableRecord = vec![("${a}".to_string(), Value::None)].into_iter().collect();
        assert_eq!(
            record.into_value(),
            Value::Dict(vec![(Value::text("${a}"), Value::None)])
        );
    }
}
