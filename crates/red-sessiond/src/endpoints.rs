//! Endpoint registry: one callable per protocol method.
//!
//! Every endpoint is the session operation composed as
//! `with_logging(with_envelope(operation))`, so it always answers with an
//! [`Envelope`] and leaves two lines in the log. Argument decoding happens
//! inside the envelope: a bad argument list is an operation failure, not a
//! transport error.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

use red_core::{with_envelope, with_logging, Envelope, Param, Value};
use red_protocol::Method;

use crate::operations::SessionOperations;

/// A registered, fully wrapped operation.
pub type Endpoint = Arc<dyn Fn(&[Param]) -> Envelope + Send + Sync>;

pub struct EndpointRegistry {
    endpoints: HashMap<Method, Endpoint>,
}

impl EndpointRegistry {
    /// Registers every method of the catalogue against `operations`.
    pub fn for_operations(operations: SessionOperations) -> Self {
        let endpoints = Method::ALL
            .into_iter()
            .map(|method| (method, endpoint_for(method, operations.clone())))
            .collect();
        Self { endpoints }
    }

    pub fn get(&self, method: Method) -> Option<Endpoint> {
        self.endpoints.get(&method).cloned()
    }

    /// Invokes an endpoint directly, bypassing the transport.
    pub fn call(&self, method: Method, params: &[Param]) -> Option<Envelope> {
        self.get(method).map(|endpoint| endpoint(params))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn wrap<F>(method: Method, operation: F) -> Endpoint
where
    F: Fn(&[Param]) -> Result<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(with_logging(method.function_name(), with_envelope(operation)))
}

fn endpoint_for(method: Method, ops: SessionOperations) -> Endpoint {
    match method {
        Method::CheckServerAvailability => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            ops.check_server_availability();
            Ok(None)
        }),
        Method::GetModulesSearchPaths => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            Ok(Some(text_list(ops.modules_search_paths()?)))
        }),
        Method::GetModulePath => wrap(method, move |params: &[Param]| {
            let (module_name, python_paths, class_paths): (String, Vec<String>, Vec<String>) =
                decode_params(params)?;
            Ok(ops
                .module_path(&module_name, &python_paths, &class_paths)?
                .map(Value::Str))
        }),
        Method::GetVariables => wrap(method, move |params: &[Param]| {
            let (source, arguments): (String, Vec<String>) = decode_params(params)?;
            Ok(Some(ops.variables(&source, &arguments).into_value()))
        }),
        Method::GetGlobalVariables => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            Ok(Some(ops.global_variables()?.into_value()))
        }),
        Method::GetStandardLibrariesNames => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            Ok(Some(text_list(ops.standard_library_names()?)))
        }),
        Method::GetStandardLibraryPath => wrap(method, move |params: &[Param]| {
            let (library_name,): (String,) = decode_params(params)?;
            Ok(ops.standard_library_path(&library_name)?.map(Value::Str))
        }),
        Method::GetRobotVersion => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            Ok(ops.robot_version().map(Value::Str))
        }),
        Method::GetRunModulePath => wrap(method, move |params: &[Param]| {
            no_params(params)?;
            Ok(ops.run_module_path()?.map(Value::Str))
        }),
        Method::CreateLibdoc => wrap(method, move |params: &[Param]| {
            let (result_path, library_name, python_paths, class_paths): (
                String,
                String,
                Vec<String>,
                Vec<String>,
            ) = decode_params(params)?;
            ops.create_libdoc(&result_path, &library_name, &python_paths, &class_paths)?;
            Ok(None)
        }),
    }
}

/// Decodes positional arguments into a tuple.
fn decode_params<T: DeserializeOwned>(params: &[Param]) -> Result<T> {
    serde_json::from_value(Param::Array(params.to_vec()))
        .with_context(|| format!("invalid arguments: {}", Param::Array(params.to_vec())))
}

fn no_params(params: &[Param]) -> Result<()> {
    if !params.is_empty() {
        bail!("takes no arguments ({} given)", params.len());
    }
    Ok(())
}

fn text_list(items: Vec<String>) -> Value {
    Value::List(items.into_iter().map(Value::Str).collect())
}
