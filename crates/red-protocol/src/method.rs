//! Catalogue of remotely callable session operations.

use std::fmt;

/// A session operation exposed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CheckServerAvailability,
    GetModulesSearchPaths,
    GetModulePath,
    GetVariables,
    GetGlobalVariables,
    GetStandardLibrariesNames,
    GetStandardLibraryPath,
    GetRobotVersion,
    GetRunModulePath,
    CreateLibdoc,
}

impl Method {
    /// Every method, in registration order.
    pub const ALL: [Method; 10] = [
        Method::GetModulesSearchPaths,
        Method::GetModulePath,
        Method::GetVariables,
        Method::GetGlobalVariables,
        Method::GetStandardLibrariesNames,
        Method::GetStandardLibraryPath,
        Method::GetRobotVersion,
        Method::GetRunModulePath,
        Method::CreateLibdoc,
        Method::CheckServerAvailability,
    ];

    /// Returns the endpoint name used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Method::CheckServerAvailability => "checkServerAvailability",
            Method::GetModulesSearchPaths => "getModulesSearchPaths",
            Method::GetModulePath => "getModulePath",
            Method::GetVariables => "getVariables",
            Method::GetGlobalVariables => "getGlobalVariables",
            Method::GetStandardLibrariesNames => "getStandardLibrariesNames",
            Method::GetStandardLibraryPath => "getStandardLibraryPath",
            Method::GetRobotVersion => "getRobotVersion",
            Method::GetRunModulePath => "getRunModulePath",
            Method::CreateLibdoc => "createLibdoc",
        }
    }

    /// Returns the function name reported in call logs.
    pub fn function_name(&self) -> &'static str {
        match self {
            Method::CheckServerAvailability => "check_server_availability",
            Method::GetModulesSearchPaths => "get_modules_search_paths",
            Method::GetModulePath => "get_module_path",
            Method::GetVariables => "get_variables",
            Method::GetGlobalVariables => "get_global_variables",
            Method::GetStandardLibrariesNames => "get_standard_libraries_names",
            Method::GetStandardLibraryPath => "get_standard_library_path",
            Method::GetRobotVersion => "get_robot_version",
            Method::GetRunModulePath => "get_run_module_path",
            Method::CreateLibdoc => "create_libdoc",
        }
    }

    /// Looks a method up by its wire name.
    pub fn from_wire_name(name: &str) -> Option<Method> {
        Self::ALL.into_iter().find(|method| method.wire_name() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wire_names_resolve() {
        for method in Method::ALL {
            assert_eq!(Method::from_wire_name(method.wire_name()), Some(method));
        }
        assert_eq!(Method::from_wire_name("getVariables"), Some(Method::GetVariables));
        assert_eq!(Method::from_wire_name("get_variables"), None);
        assert_eq!(Method::from_wire_name(""), None);
    }

    #[test]
    fn test_names_are_unique() {
        let wire: HashSet<_> = Method::ALL.iter().map(Method::wire_name).collect();
        let functions: HashSet<_> = Method::ALL.iter().map(Method::function_name).collect();
        assert_eq!(wire.len(), Method::ALL.len());
        assert_eq!(functions.len(), Method::ALL.len());
    }
}
