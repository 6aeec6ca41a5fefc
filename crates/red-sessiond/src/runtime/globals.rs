//! Global variables across runtime versions.
//!
//! Older runtimes publish their globals as a module-level table; newer ones
//! only through a settings-derived scope. [`collect_global_variables`]
//! probes the legacy shape first, falls back to the scoped one, and merges
//! the result with the baseline built-in variables into one record.

use std::path::MAIN_SEPARATOR;

use tracing::debug;

use red_core::{decorate_variable_name, SearchPath, Value, VariableRecord};

use super::{NamedValues, RuntimeError, VariableStore};

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: &str = ":";

/// Variables that only exist at execution time; blank in the scoped shape.
const EXECUTION_ONLY: [&str; 5] = [
    "${OUTPUT_DIR}",
    "${EXECDIR}",
    "${OUTPUT_FILE}",
    "${REPORT_FILE}",
    "${LOG_FILE}",
];

/// Shape in which a runtime publishes its global variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalsSchema {
    Legacy,
    Scoped,
}

impl GlobalsSchema {
    fn fetch(self, store: &dyn VariableStore, path: &SearchPath) -> Result<NamedValues, RuntimeError> {
        match self {
            GlobalsSchema::Legacy => store.legacy_globals(path),
            GlobalsSchema::Scoped => store.scoped_globals(path),
        }
    }

    /// Adjusts the baseline and the runtime's set for this shape.
    fn adjust(self, baseline: &mut VariableRecord, runtime: &mut VariableRecord) {
        if self == GlobalsSchema::Scoped {
            baseline.insert("&{EMPTY}", Value::Dict(Vec::new()));
            baseline.insert("&{SUITE_METADATA}", Value::Dict(Vec::new()));
            for name in EXECUTION_ONLY {
                runtime.insert(name, Value::text(""));
            }
        }
    }
}

/// Returns the runtime's well-known built-in variables.
pub fn baseline_global_variables() -> VariableRecord {
    let temp_dir = std::env::temp_dir().display().to_string();
    let empty_text = [
        "${EXECDIR}",
        "${EMPTY}",
        "${OUTPUT_DIR}",
        "${OUTPUT_FILE}",
        "${SUMMARY_FILE}",
        "${REPORT_FILE}",
        "${LOG_FILE}",
        "${DEBUG_FILE}",
        "${PREV_TEST_NAME}",
        "${PREV_TEST_STATUS}",
        "${PREV_TEST_MESSAGE}",
        "${TEST_NAME}",
        "${TEST_DOCUMENTATION}",
        "${TEST_STATUS}",
        "${TEST_MESSAGE}",
        "${SUITE_NAME}",
        "${SUITE_SOURCE}",
        "${SUITE_STATUS}",
        "${SUITE_MESSAGE}",
        "${SUITE_DOCUMENTATION}",
        "${KEYWORD_MESSAGE}",
        "${KEYWORD_STATUS}",
    ];

    let mut record = VariableRecord::new();
    record.insert("${TEMPDIR}", Value::text(temp_dir));
    record.insert("${/}", Value::text(MAIN_SEPARATOR.to_string()));
    record.insert("${:}", Value::text(PATH_LIST_SEPARATOR));
    record.insert("${SPACE}", Value::text(" "));
    record.insert("@{EMPTY}", Value::List(Vec::new()));
    record.insert("${True}", Value::Bool(true));
    record.insert("${False}", Value::Bool(false));
    record.insert("${None}", Value::None);
    record.insert("${null}", Value::None);
    record.insert("${CURDIR}", Value::text("."));
    record.insert("@{TEST_TAGS}", Value::List(Vec::new()));
    for name in empty_text {
        record.insert(name, Value::text(""));
    }
    record
}

/// Collects the unified global-variable record.
///
/// Only failures other than a missing legacy shape are reported.
pub fn collect_global_variables(
    store: &dyn VariableStore,
    path: &SearchPath,
) -> Result<VariableRecord, RuntimeError> {
    let (schema, variables) = match GlobalsSchema::Legacy.fetch(store, path) {
        Ok(variables) => (GlobalsSchema::Legacy, variables),
        Err(RuntimeError::Unsupported(reason)) => {
            debug!(reason = %reason, "Legacy global variables unavailable, using scoped shape");
            (GlobalsSchema::Scoped, GlobalsSchema::Scoped.fetch(store, path)?)
        }
        Err(e) => return Err(e),
    };

    let mut baseline = baseline_global_variables();
    let mut record: VariableRecord = variables
        .into_iter()
        .map(|(name, value)| (decorate_variable_name(&name), value))
        .collect();
    schema.adjust(&mut baseline, &mut record);

    for (name, value) in baseline {
        if !record.contains(&name) {
            record.insert(name, value);
        }
    }

    debug!(schema = ?schema, count = record.len(), "Global variables collected");
    Ok(record)
}
