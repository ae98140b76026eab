use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, ExtractionOutcome, ExtractionRequestBuilder, ImageFile, PaletteClient, PaletteRender,
    ParameterField, UploadOutcome, UploadState,
};
use shared::domain::{ExtractionMode, PaletteEntry};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Image to upload.
    #[arg(long)]
    image: PathBuf,
    /// Base URL of the extraction service; overrides palette.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    request_timeout_secs: Option<u64>,
    #[arg(long)]
    colors: Option<i64>,
    /// `0`/`median-cut` or `1`/`tolerance-merge`.
    #[arg(long)]
    mode: Option<ExtractionMode>,
    #[arg(long)]
    concurrent: bool,
    #[arg(long)]
    workers: Option<i64>,
    #[arg(long)]
    tolerance: Option<i64>,
    /// Raw widget input such as `tolerance=120`; applied after the typed flags.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    raw_inputs: Vec<String>,
    /// Write the preview echoed by the upload endpoint to this path.
    #[arg(long)]
    save_preview: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url.clone() {
        settings.service_url = url;
    }
    if let Some(secs) = args.request_timeout_secs {
        settings.request_timeout_secs = Some(secs);
    }
    let client = PaletteClient::new(&settings)?;

    let image = ImageFile::from_path(&args.image).await?;
    client.select_file(image).await;

    match client.upload().await? {
        UploadOutcome::Completed(UploadState::Uploaded) => {}
        UploadOutcome::Completed(state) => {
            let reason = client
                .with_session(|session| session.upload().last_error().map(ToString::to_string))
                .await
                .unwrap_or_else(|| format!("{state:?}"));
            return Err(anyhow!("upload did not succeed: {reason}"));
        }
        other => return Err(anyhow!("upload did not complete: {other:?}")),
    }

    if let Some(path) = &args.save_preview {
        save_preview(&client, path).await?;
    }

    let params = client
        .edit_parameters(|builder| {
            if let Some(n) = args.colors {
                builder.set_color_count(n);
            }
            if let Some(mode) = args.mode {
                builder.set_mode(mode);
            }
            builder.set_concurrent(args.concurrent);
            if let Some(n) = args.workers {
                builder.set_worker_count(n);
            }
            if let Some(n) = args.tolerance {
                builder.set_tolerance(n);
            }
            for raw in &args.raw_inputs {
                if let Err(error) = apply_raw_input(builder, raw) {
                    warn!(input = %raw, %error, "ignoring parameter input");
                }
            }
        })
        .await;
    info!(
        colors = params.color_count.get(),
        mode = %params.mode,
        concurrent = params.concurrent,
        workers = params.worker_count.get(),
        tolerance = params.tolerance.get(),
        "extraction parameters"
    );

    if let ExtractionOutcome::AlreadyPending = client.request_extraction().await? {
        println!("Loading...");
        return Ok(());
    }

    let failure = client
        .with_session(|session| {
            print_render(session.view().render());
            session.view().error().cloned()
        })
        .await;
    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn apply_raw_input(
    builder: &mut ExtractionRequestBuilder,
    raw: &str,
) -> Result<()> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE"))?;
    let field: ParameterField = field.parse()?;
    builder.apply_input(field, value)?;
    Ok(())
}

async fn save_preview(client: &PaletteClient, path: &Path) -> Result<()> {
    let preview = client
        .with_session(|session| session.upload().preview().cloned())
        .await;
    let Some(preview) = preview else {
        warn!("service returned no preview image");
        return Ok(());
    };
    tokio::fs::write(path, &preview.bytes)
        .await
        .with_context(|| format!("failed to write preview '{}'", path.display()))?;
    info!(path = %path.display(), mime_type = %preview.mime_type, "preview saved");
    Ok(())
}

fn print_render(render: PaletteRender<'_>) {
    match render {
        PaletteRender::Empty => println!("No palette yet."),
        PaletteRender::Loading => println!("Loading..."),
        PaletteRender::Palette(entries) => {
            for entry in entries {
                println!("{} {}: {}", swatch(entry), entry.color, entry.frequency);
            }
        }
        // Reported through the returned error.
        PaletteRender::Error(_) => {}
    }
}

fn swatch(entry: &PaletteEntry) -> String {
    match entry.rgb() {
        Some((r, g, b)) => format!("\x1b[48;2;{r};{g};{b}m    \x1b[0m"),
        None => "    ".to_string(),
    }
}
