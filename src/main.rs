use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "pagecraft")]
#[command(version, about = "Generate web apps with an LLM and publish them to GitHub Pages")]
pub struct Cli {
    /// Debug-level logging for pagecraft
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the task endpoint over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Allow cross-origin requests from any origin
        #[arg(long)]
        dev: bool,
    },
    /// Run a single round in the foreground from a request JSON file
    Run {
        /// Path to a task request (same body as POST /api-endpoint)
        request: PathBuf,
    },
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "pagecraft=debug,tower_http=debug"
    } else {
        "pagecraft=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(&cli);

    match &cli.command {
        Commands::Serve { host, port, dev } => {
            cmd::cmd_serve(host.clone(), *port, *dev).await?;
        }
        Commands::Run { request } => cmd::cmd_run(request).await?,
    }

    Ok(())
}
