//! The `demo` command - streams a sandbox while the mouse wanders around.

use clap::Args;
use nanodesk::{ClientConfig, DesktopClient, Sandbox, StreamOptions};
use rand::Rng;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

#[derive(Args)]
pub struct DemoArgs {
    /// Number of random right clicks
    #[arg(long, default_value = "5")]
    moves: u32,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value = "2000")]
    interval_ms: u64,

    /// Kill the sandbox right away instead of waiting for Enter
    #[arg(long)]
    no_wait: bool,
}

pub async fn run(args: DemoArgs, config: ClientConfig) -> anyhow::Result<()> {
    let client = DesktopClient::connect(&config).await?;

    eprintln!("> Starting desktop sandbox...");
    let sandbox = client.sandbox().create().await?;
    eprintln!(" - Sandbox started, ID: {}", sandbox.sandbox_id());

    let result = drive(&sandbox, &args).await;

    eprintln!("> Killing desktop sandbox...");
    sandbox.kill().await?;
    eprintln!(" - Sandbox killed");

    result
}

async fn drive(sandbox: &Sandbox, args: &DemoArgs) -> anyhow::Result<()> {
    let size = sandbox.get_screen_size().await?;
    eprintln!(" - Screen size: {}", size);

    eprintln!("> Starting desktop stream...");
    let stream = sandbox.stream();
    stream.start(StreamOptions::new().require_auth(true)).await?;
    let key = stream.get_auth_key().await?;
    println!("{}", stream.get_url(Some(&key)));

    eprintln!("> Randomly moving mouse and right clicking {} times...", args.moves);
    for i in 0..args.moves {
        let (x, y) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..size.width), rng.gen_range(0..size.height))
        };
        sandbox.move_mouse(x, y).await?;
        sandbox.right_click().await?;
        eprintln!(" - Right clicked at {}, {} ({}/{})", x, y, i + 1, args.moves);
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    if !args.no_wait {
        eprintln!("Press Enter to kill the sandbox...");
        let mut line = String::new();
        tokio::io::BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
    }

    eprintln!("> Stopping desktop stream...");
    stream.stop().await?;
    Ok(())
}
