mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::{demo, screenshot, stream, version};
use config::ConnectionArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nanodesk")]
#[command(about = "Drive remote desktop sandboxes from the command line")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a sandbox while moving the mouse around
    Demo(demo::DemoArgs),

    /// Capture the screen of a fresh sandbox
    Screenshot(screenshot::ScreenshotArgs),

    /// Share a sandbox desktop until interrupted
    Stream(stream::StreamArgs),

    /// Show version information
    Version(version::VersionArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo(args) => demo::run(args, cli.connection.resolve()?).await?,
        Commands::Screenshot(args) => screenshot::run(args, cli.connection.resolve()?).await?,
        Commands::Stream(args) => stream::run(args, cli.connection.resolve()?).await?,
        Commands::Version(args) => version::run(args),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn connection_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nanodesk",
            "screenshot",
            "--endpoint",
            "desk.example.com:49983",
            "--out",
            "shot.png",
        ])
        .unwrap();
        assert_eq!(
            cli.connection.endpoint.as_deref(),
            Some("desk.example.com:49983")
        );
        assert!(matches!(cli.command, Commands::Screenshot(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let result = Cli::try_parse_from(["nanodesk", "--request-timeout", "0", "version"]);
        assert!(result.is_err());
    }
}
