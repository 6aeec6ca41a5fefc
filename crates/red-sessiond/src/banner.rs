//! Startup banner written once the server is listening.

use std::io::{self, Write};
use std::path::Path;

/// Shown in place of the runtime version when it is not installed.
pub const NO_RUNTIME: &str = "<no robot installed>";

/// Shown when the interpreter version cannot be determined.
pub const UNKNOWN_INTERPRETER: &str = "<unknown>";

/// Renders the banner, blank line included.
pub fn startup_banner(
    port: u16,
    interpreter_version: Option<&str>,
    runtime_version: Option<&str>,
    executable: &Path,
) -> String {
    format!(
        "# RED session server started @{port}\n\
         # python version: {}\n\
         # robot version: {}\n\
         # script path: {}\n\n",
        interpreter_version.unwrap_or(UNKNOWN_INTERPRETER),
        runtime_version.unwrap_or(NO_RUNTIME),
        executable.display(),
    )
}

/// Writes the banner to `out` and flushes it.
pub fn write_banner<W: Write>(out: &mut W, banner: &str) -> io::Result<()> {
    out.write_all(banner.as_bytes())?;
    out.flush()
}

/// Writes the banner to stdout.
pub fn print_banner(banner: &str) -> io::Result<()> {
    write_banner(&mut io::stdout().lock(), banner)
}
