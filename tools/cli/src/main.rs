//! cloudferry CLI - list and transfer files between Google Drive accounts.
//!
//! Runs the same commands as the browser bindings, over a native HTTP
//! client instead of the page's `fetch`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::rc::Rc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use cloudferry_storage::{HttpTransport, ReqwestTransport};
use cloudferry_web::{BridgeContext, ListOutcome};

#[derive(Parser)]
#[command(name = "cloudferry")]
#[command(about = "cloudferry - Google Drive listing and transfer")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries at a path.
    Ls {
        /// Remote name to configure the account under.
        #[arg(default_value = "drive")]
        remote: String,

        /// Path within the account (default: root).
        #[arg(default_value = "")]
        path: String,

        /// OAuth access token.
        #[arg(short, long, env = "CLOUDFERRY_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Copy one file from one account to another.
    Transfer {
        /// File path in the source account.
        source: String,

        /// Destination path: an existing folder, a file to overwrite, or a new file path.
        destination: String,

        /// Access token for the source account.
        #[arg(long, env = "CLOUDFERRY_SOURCE_TOKEN", hide_env_values = true)]
        source_token: String,

        /// Access token for the destination account.
        #[arg(long, env = "CLOUDFERRY_DESTINATION_TOKEN", hide_env_values = true)]
        destination_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let context = build_context()?;

    match cli.command {
        Commands::Ls {
            remote,
            path,
            token,
        } => cmd_ls(&context, &remote, &path, &token, cli.json).await,

        Commands::Transfer {
            source,
            destination,
            source_token,
            destination_token,
        } => {
            cmd_transfer(
                &context,
                &source_token,
                &destination_token,
                &source,
                &destination,
                cli.json,
            )
            .await
        }
    }
}

/// Command context over a native HTTP client.
fn build_context() -> Result<BridgeContext> {
    let user_agent = concat!("cloudferry/", env!("CARGO_PKG_VERSION"));
    let transport: Rc<dyn HttpTransport> =
        Rc::new(ReqwestTransport::new(user_agent).context("Failed to create HTTP client")?);
    BridgeContext::with_transport(transport).context("Failed to set up storage backends")
}

/// List a path.
async fn cmd_ls(
    context: &BridgeContext,
    remote: &str,
    path: &str,
    token: &str,
    json: bool,
) -> Result<()> {
    debug!("Listing {}:{}", remote, path);

    let outcome = context.list_files(remote, token, path).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        ListOutcome::Files(files) => {
            if !json {
                if files.is_empty() {
                    println!("(empty)");
                }
                for file in files {
                    println!("{}", file);
                }
            }
            Ok(())
        }
        ListOutcome::Error(error) => anyhow::bail!(error),
    }
}

/// Transfer a single file.
async fn cmd_transfer(
    context: &BridgeContext,
    source_token: &str,
    destination_token: &str,
    source: &str,
    destination: &str,
    json: bool,
) -> Result<()> {
    debug!("Transferring {} -> {}", source, destination);

    let outcome = context
        .start_transfer(source_token, destination_token, source, destination)
        .await;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    if !outcome.is_complete() {
        anyhow::bail!("{}", outcome.message());
    }
    if !json {
        println!("{}", outcome.message());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ls_defaults() {
        let cli = Cli::try_parse_from(["cloudferry", "ls", "--token", "t"]).unwrap();
        match cli.command {
            Commands::Ls { remote, path, token } => {
                assert_eq!(remote, "drive");
                assert_eq!(path, "");
                assert_eq!(token, "t");
            }
            _ => panic!("expected ls"),
        }
    }

    #[test]
    fn test_parse_transfer() {
        let cli = Cli::try_parse_from([
            "cloudferry",
            "--json",
            "transfer",
            "a/report.pdf",
            "inbox",
            "--source-token",
            "s",
            "--destination-token",
            "d",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Transfer { .. }));
    }
}
