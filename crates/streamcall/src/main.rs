//! streamcall - call tools on an MCP server over streamable HTTP.
//!
//! This is the main entry point for the streamcall CLI.

mod logging;
mod render;

use clap::{Parser, Subcommand};
use logging::LogLevel;
use render::OutputFormat;
use serde_json::{Map, Value};
use std::path::PathBuf;
use streamcall_mcp::ClientConfig;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser)]
#[command(name = "streamcall")]
#[command(author, version, about = "Call tools on an MCP server over streamable HTTP", long_about = None)]
struct Cli {
    /// MCP endpoint URL (default: http://localhost:3000/mcp)
    #[arg(long, global = true)]
    url: Option<String>,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to the server's echo tool
    Echo {
        /// Message to send
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Call any tool
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Print the decoded payload instead of the joined content text
        #[arg(long)]
        raw: bool,
    },
}

/// Layer command-line flags over the optional config file.
fn build_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = Some(secs);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(LogLevel::from_verbosity(cli.verbose));

    let config = build_config(&cli)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_ctrl_c.cancel();
        }
    });

    let output = match cli.command {
        Commands::Echo { message } => {
            let mut arguments = Map::new();
            arguments.insert("message".to_string(), Value::String(message.join(" ")));
            render::run_tool(config, "echo", arguments, OutputFormat::Text, Some(cancel)).await
        }
        Commands::Call { tool, args, raw } => {
            let arguments = render::parse_arguments(&args)?;
            let format = if raw {
                OutputFormat::Raw
            } else {
                OutputFormat::Text
            };
            render::run_tool(config, &tool, arguments, format, Some(cancel)).await
        }
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_echo() {
        let cli = Cli::try_parse_from(["streamcall", "echo", "hello", "world"]).unwrap();
        match cli.command {
            Commands::Echo { message } => assert_eq!(message, vec!["hello", "world"]),
            _ => panic!("Expected Echo"),
        }
        assert!(Cli::try_parse_from(["streamcall", "echo"]).is_err());
    }

    #[test]
    fn test_parse_call_with_globals() {
        let cli = Cli::try_parse_from([
            "streamcall",
            "call",
            "search",
            "--args",
            r#"{"q": "rust"}"#,
            "--raw",
            "--url",
            "https://example.com/mcp",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.url.as_deref(), Some("https://example.com/mcp"));
        match cli.command {
            Commands::Call { tool, args, raw } => {
                assert_eq!(tool, "search");
                assert_eq!(args, r#"{"q": "rust"}"#);
                assert!(raw);
            }
            _ => panic!("Expected Call"),
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let cli = Cli::try_parse_from(["streamcall", "echo", "hi"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_build_config_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "http://file.example/mcp", "timeoutSecs": 10}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "streamcall",
            "--config",
            &path,
            "--url",
            "http://flag.example/mcp",
            "echo",
            "hi",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.url, "http://flag.example/mcp");
        assert_eq!(config.timeout_secs, Some(10));
    }

    #[test]
    fn test_build_config_rejects_bad_url() {
        let cli = Cli::try_parse_from(["streamcall", "--url", "localhost:3000", "echo", "hi"])
            .unwrap();
        assert!(build_config(&cli).is_err());
    }
}
