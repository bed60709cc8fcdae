//! The `stream` command - shares a sandbox desktop until Ctrl+C.

use clap::Args;
use nanodesk::{ClientConfig, DesktopClient, ResizeMode, Sandbox, StreamOptions, StreamUrlOptions};

#[derive(Args)]
pub struct StreamArgs {
    /// Require an auth key to view the stream
    #[arg(long)]
    auth: bool,

    /// Viewers cannot send input
    #[arg(long)]
    view_only: bool,

    /// Open this file or URL once the stream is up
    #[arg(long)]
    open: Option<String>,
}

pub async fn run(args: StreamArgs, config: ClientConfig) -> anyhow::Result<()> {
    let client = DesktopClient::connect(&config).await?;
    let sandbox = client.sandbox().create().await?;

    let result = share(&sandbox, &args).await;
    sandbox.kill().await?;
    eprintln!("Sandbox {} killed", sandbox.sandbox_id());
    result
}

async fn share(sandbox: &Sandbox, args: &StreamArgs) -> anyhow::Result<()> {
    let stream = sandbox.stream();
    stream
        .start(StreamOptions::new().require_auth(args.auth))
        .await?;

    let key = if args.auth {
        Some(stream.get_auth_key().await?)
    } else {
        None
    };
    let url = stream.get_url_with(&StreamUrlOptions {
        auth_key: key.as_ref(),
        auto_connect: true,
        view_only: args.view_only,
        resize: Some(ResizeMode::Scale),
    });
    println!("{}", url);

    if let Some(target) = &args.open {
        sandbox.open(target).await?;
    }

    eprintln!("Streaming sandbox {}. Press Ctrl+C to stop.", sandbox.sandbox_id());
    tokio::signal::ctrl_c().await?;

    stream.stop().await?;
    Ok(())
}
