//! RED session server
//!
//! Spawned by the editor once per editing session. Serves runtime
//! introspection calls on a loopback port and exits when the editor closes
//! the server's stdin.
//!
//! # Usage
//!
//! ```bash
//! # Serve on port 8270 using the default interpreter
//! red-session-server 8270
//!
//! # Use a specific interpreter
//! RED_SESSION_PYTHON=/usr/bin/python3 red-session-server 8270
//!
//! # Enable debug logging
//! RUST_LOG=red_sessiond=debug red-session-server 8270
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use red_core::SharedSearchPath;
use red_sessiond::banner::{print_banner, startup_banner};
use red_sessiond::config::{ServerConfig, DEFAULT_INTERPRETER};
use red_sessiond::endpoints::EndpointRegistry;
use red_sessiond::logging::init_logging;
use red_sessiond::operations::SessionOperations;
use red_sessiond::runtime::{PythonRuntime, RuntimeServices, VersionReporter};
use red_sessiond::server::SessionServer;
use red_sessiond::supervisor::watch_stdin;

/// RED session server - runtime introspection for the editor
#[derive(Parser, Debug)]
#[command(name = "red-session-server", version, about)]
struct Args {
    /// Loopback port to listen on
    port: u16,

    /// Interpreter hosting the test-automation runtime
    #[arg(long, env = "RED_SESSION_PYTHON", default_value = DEFAULT_INTERPRETER)]
    python: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let runtime = Arc::new(PythonRuntime::new(args.python));
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        interpreter = runtime.interpreter(),
        "RED session server starting"
    );

    let services = RuntimeServices::from_runtime(Arc::clone(&runtime));
    let operations = SessionOperations::new(services, SharedSearchPath::default());
    let endpoints = EndpointRegistry::for_operations(operations);

    let cancel_token = CancellationToken::new();
    let config = ServerConfig::new(args.port);
    let server = SessionServer::bind(config, endpoints, cancel_token.clone()).await?;
    let port = server.local_addr()?.port();

    watch_stdin(cancel_token).context("Failed to start parent-liveness supervisor")?;

    let (interpreter_version, runtime_version) = tokio::task::spawn_blocking(move || {
        (runtime.interpreter_version(), runtime.full_version())
    })
    .await
    .context("Failed to query runtime versions")?;

    let executable = env::current_exe().context("Failed to resolve executable path")?;
    let banner = startup_banner(
        port,
        interpreter_version.as_deref(),
        runtime_version.as_deref(),
        &executable,
    );
    print_banner(&banner).context("Failed to write startup banner")?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("RED session server stopped");
    Ok(())
}
