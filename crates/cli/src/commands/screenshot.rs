//! The `screenshot` command - captures a fresh sandbox's screen.

use anyhow::Context;
use clap::Args;
use nanodesk::{ClientConfig, DesktopClient, Sandbox, ScreenshotFormat, files};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct ScreenshotArgs {
    /// Where to write the capture
    #[arg(long, short, default_value = "screenshot.png")]
    out: PathBuf,

    /// Write raw RGBA pixels instead of PNG
    #[arg(long)]
    raw: bool,

    /// Upload a local file into the sandbox home before capturing
    /// (format: local or local:remote-name)
    #[arg(long, value_parser = parse_upload)]
    upload: Vec<Upload>,

    /// File or URL to open before capturing
    #[arg(long)]
    open: Option<String>,

    /// Seconds to wait after opening before capturing
    #[arg(long, default_value = "3")]
    settle: u64,
}

#[derive(Debug, Clone)]
struct Upload {
    local: PathBuf,
    remote: String,
}

fn parse_upload(s: &str) -> Result<Upload, String> {
    let (local, name) = match s.split_once(':') {
        Some((local, name)) => (local, name),
        None => {
            let name = std::path::Path::new(s)
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| format!("cannot derive a file name from '{s}'"))?;
            (s, name)
        }
    };
    if local.is_empty() {
        return Err("local path cannot be empty".to_string());
    }
    if name.is_empty() {
        return Err("remote name cannot be empty".to_string());
    }

    let local = PathBuf::from(local);
    if !local.is_file() {
        return Err(format!("file not found: {}", local.display()));
    }
    Ok(Upload {
        local,
        remote: files::home_path(name),
    })
}

pub async fn run(args: ScreenshotArgs, config: ClientConfig) -> anyhow::Result<()> {
    let client = DesktopClient::connect(&config).await?;
    let sandbox = client.sandbox().create().await?;
    tracing::info!(sandbox_id = %sandbox.sandbox_id(), "sandbox created");

    let result = capture(&sandbox, &args).await;
    sandbox.kill().await?;
    let bytes = result?;

    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    eprintln!("Wrote {} bytes to {}", bytes.len(), args.out.display());
    Ok(())
}

async fn capture(sandbox: &Sandbox, args: &ScreenshotArgs) -> anyhow::Result<Vec<u8>> {
    for upload in &args.upload {
        let contents = std::fs::read(&upload.local)
            .with_context(|| format!("failed to read {}", upload.local.display()))?;
        sandbox.files().write(&upload.remote, contents).await?;
        eprintln!("Uploaded {} to {}", upload.local.display(), upload.remote);
    }

    if let Some(target) = &args.open {
        sandbox.open(target).await?;
        tokio::time::sleep(Duration::from_secs(args.settle)).await;
    }

    let format = if args.raw {
        ScreenshotFormat::Raw
    } else {
        ScreenshotFormat::Png
    };
    Ok(sandbox.screenshot(format).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults_to_local_file_name() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let upload = parse_upload(file.path().to_str().unwrap()).unwrap();
        let name = file.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(upload.remote, format!("/home/user/{name}"));
    }

    #[test]
    fn upload_with_remote_name() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let spec = format!("{}:report.pdf", file.path().display());
        let upload = parse_upload(&spec).unwrap();
        assert_eq!(upload.remote, "/home/user/report.pdf");
        assert_eq!(upload.local, file.path());
    }

    #[test]
    fn upload_requires_existing_file() {
        let err = parse_upload("/nonexistent/file.txt:x.txt").unwrap_err();
        assert!(err.contains("file not found"));
    }
}
