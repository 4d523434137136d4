//! CLI command implementations

use anyhow::{bail, Context, Result};
use logicbox_sandbox::{SandboxConfig, SandboxService};
use logicbox_transport::{start_server, HttpServerState, StdioHandler};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

/// Load configuration from `path`, or from the default location
pub fn load_config(path: Option<&Path>) -> Result<SandboxConfig> {
    let config = match path {
        Some(path) => SandboxConfig::load_from(path)?,
        None => SandboxConfig::load()?,
    };
    Ok(config)
}

fn build_service(config: &SandboxConfig) -> Result<Arc<SandboxService>> {
    let service = SandboxService::from_config(config).context("Invalid symbol allow-list")?;
    Ok(Arc::new(service))
}

/// Bind address with CLI overrides applied
pub fn bind_addr(config: &SandboxConfig, host: Option<&str>, port: Option<u16>) -> Result<SocketAddr> {
    let mut addr = config.server.bind_addr;
    if let Some(host) = host {
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("Invalid host address: {}", host))?;
        addr.set_ip(ip);
    }
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

/// Serve over HTTP until interrupted
pub async fn run_serve(config: SandboxConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let service = build_service(&config)?;
    let addr = bind_addr(&config, host.as_deref(), port)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        symbols = service.symbols().len(),
        runtime = service.runtime_name(),
        "logicbox ready"
    );
    start_server(
        listener,
        HttpServerState::new(service),
        config.server.max_body_bytes,
    )
    .await
}

/// Serve stdin/stdout until EOF
pub async fn run_stdio(config: SandboxConfig) -> Result<()> {
    let service = build_service(&config)?;
    StdioHandler::new(service)
        .with_max_line_bytes(config.server.max_body_bytes)
        .run_stdio()
        .await?;
    Ok(())
}

/// Script text from the argument, a file, or stdin
pub async fn read_script(script: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(script) = script {
        return Ok(script);
    }
    if let Some(file) = file {
        return tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read script {}", file.display()));
    }
    let mut script = String::new();
    tokio::io::stdin()
        .read_to_string(&mut script)
        .await
        .context("Failed to read script from stdin")?;
    Ok(script)
}

/// Run one script and print the JSON response; returns whether it succeeded
pub async fn run_script(
    config: SandboxConfig,
    script: String,
    timeout_ms: Option<u64>,
    pretty: bool,
) -> Result<bool> {
    let service = build_service(&config)?;
    let mut request = serde_json::json!({ "expr": script });
    if let Some(timeout_ms) = timeout_ms {
        request["timeout_ms"] = timeout_ms.into();
    }
    let response = service.handle_value(&request).await;
    let encoded = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", encoded);
    Ok(response.is_success())
}

/// Print the resolved allow-list
pub fn print_symbols(config: &SandboxConfig, json: bool) -> Result<()> {
    let table = config
        .symbols
        .resolve()
        .context("Invalid symbol allow-list")?;
    let symbols = table.describe();
    if json {
        println!("{}", serde_json::to_string_pretty(&symbols)?);
        return Ok(());
    }
    let width = symbols.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut group = "";
    for symbol in &symbols {
        if symbol.group != group {
            group = symbol.group.as_str();
            println!("[{}]", group);
        }
        println!("  {:width$}  {}", symbol.name, symbol.summary, width = width);
    }
    Ok(())
}

/// Write the default configuration
pub fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => SandboxConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    SandboxConfig::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
