mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logicbox_transport::{init_tracing, LogOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logicbox")]
#[command(about = "Sandboxed first-order logic script engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve scripts over HTTP
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Config file (default: ~/.config/logicbox/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Serve line-delimited JSON requests on stdin/stdout
    Stdio {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },
    /// Run one script and print the response
    Run {
        /// Script text; read from --file or stdin when absent
        script: Option<String>,

        /// Read the script from a file
        #[arg(short, long, conflicts_with = "script")]
        file: Option<PathBuf>,

        /// Wall-clock budget in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },
    /// List the symbols scripts can use
    Symbols {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a config file with the default settings
    InitConfig {
        /// Destination (default: ~/.config/logicbox/config.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config,
            log_file,
            verbose,
        } => {
            let _guard = init_tracing(&LogOptions { verbose, log_file })?;
            let config = commands::load_config(config.as_deref())?;
            commands::run_serve(config, host, port).await
        }
        Commands::Stdio { config, verbose } => {
            let _guard = init_tracing(&LogOptions {
                verbose,
                log_file: None,
            })?;
            let config = commands::load_config(config.as_deref())?;
            commands::run_stdio(config).await
        }
        Commands::Run {
            script,
            file,
            timeout_ms,
            pretty,
            config,
            verbose,
        } => {
            // Quiet by default so stderr only carries the caller's output
            let _guard = if verbose {
                init_tracing(&LogOptions {
                    verbose,
                    log_file: None,
                })?
            } else {
                None
            };
            let config = commands::load_config(config.as_deref())?;
            let source = commands::read_script(script, file.as_deref()).await?;
            let succeeded = commands::run_script(config, source, timeout_ms, pretty).await?;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Symbols { config, json } => {
            let config = commands::load_config(config.as_deref())?;
            commands::print_symbols(&config, json)
        }
        Commands::InitConfig { path, force } => commands::init_config(path, force),
    }
}
