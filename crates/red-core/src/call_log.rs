//! Invocation and completion logging around session operations.

use tracing::info;

use crate::envelope::{Envelope, Param};
use crate::value::Value;

/// Wraps an enveloped call so that its invocation and outcome are logged.
///
/// The returned envelope is the wrapped call's, unchanged.
pub fn with_logging<F>(name: &'static str, call: F) -> impl Fn(&[Param]) -> Envelope + Send + Sync
where
    F: Fn(&[Param]) -> Envelope + Send + Sync,
{
    move |params| {
        info!("{}", describe_call(name, params));
        let envelope = call(params);
        info!("{}", describe_outcome(&envelope));
        envelope
    }
}

/// Describes a call and its positional arguments.
pub fn describe_call(name: &str, params: &[Param]) -> String {
    let mut message = format!("calling '{name}' function, ");
    if params.is_empty() {
        message.push_str("no arguments");
    } else {
        message.push_str("supplied arguments:");
        for param in params {
            message.push_str("\n    > ");
            message.push_str(&render_param(param));
        }
    }
    message
}

/// Describes how a call ended.
pub fn describe_outcome(envelope: &Envelope) -> String {
    if envelope.is_failure() {
        return "call ended with exception, see error log for details".to_string();
    }
    match &envelope.result {
        Some(value) => format!("call ended with result:\n    > {value}"),
        None => "call ended with result:\n    > None".to_string(),
    }
}

/// Arguments are rendered like results, in the runtime's `str()` form.
fn render_param(param: &Param) -> String {
    param_value(param).to_string()
}

fn param_value(param: &Param) -> Value {
    match param {
        Param::Null => Value::None,
        Param::Bool(flag) => Value::Bool(*flag),
        Param::Number(number) => match (number.as_i64(), number.as_u64()) {
            (Some(small), _) => Value::Int(i128::from(small)),
            (None, Some(unsigned)) => Value::Int(i128::from(unsigned)),
            (None, None) => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        Param::String(text) => Value::Str(text.clone()),
        Param::Array(items) => Value::List(items.iter().map(param_value).collect()),
        Param::Object(entries) => Value::Dict(
            entries
                .iter()
                .map(|(key, value)| (Value::Str(key.clone()), param_value(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_call_without_arguments() {
        assert_eq!(
            describe_call("check_server_availability", &[]),
            "calling 'check_server_availability' function, no arguments"
        );
    }

    #[test]
    fn test_describe_call_with_arguments() {
        let message = describe_call("get_module_path", &[json!("mod"), json!(["/a", "/b"])]);
        assert_eq!(
            message,
            "calling 'get_module_path' function, supplied arguments:\n    > mod\n    > ['/a', '/b']"
        );
    }

    #[test]
    fn test_arguments_render_like_results() {
        let message = describe_call(
            "create_libdoc",
            &[json!(null), json!(true), json!(2.0), json!({"k": [1, "it's"]})],
        );
        assert_eq!(
            message,
            "calling 'create_libdoc' function, supplied arguments:\n    > None\n    > True\n    > 2.0\n    > {'k': [1, 'it\\'s']}"
        );
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(
            describe_outcome(&Envelope::failure("trace")),
            "call ended with exception, see error log for details"
        );
        assert_eq!(
            describe_outcome(&Envelope::success(Some(Value::List(vec![Value::text("x")])))),
            "call ended with result:\n    > ['x']"
        );
        assert_eq!(
            describe_outcome(&Envelope::success(None)),
            "call ended with result:\n    > None"
        );
    }

    #[test]
    fn test_logging_does_not_alter_envelope() {
        let call = with_logging("op", |_: &[Param]| Envelope::failure("kept"));
        assert_eq!(call(&[json!(1)]), Envelope::failure("kept"));
    }
}
