use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};

use gifforge::{
    ControllerState, FfmpegGifEncoder, FrameStore, GifController, GifEncoder as _, GifSettings,
    LoopMode,
};

#[derive(Parser, Debug)]
#[command(name = "gifforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode an ordered list of images into an animated GIF (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Probe the encoder executable and print its version line.
    Probe,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Settings JSON file; omitted fields fall back to defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output width in pixels (defaults to the first image's width).
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (defaults to the first image's height).
    #[arg(long)]
    height: Option<u32>,

    /// Per-frame delay in milliseconds.
    #[arg(long)]
    delay_ms: Option<u32>,

    /// Palette quality, 1 (best) to 30.
    #[arg(long)]
    quality: Option<u32>,

    /// Play the GIF once instead of looping forever.
    #[arg(long)]
    no_loop: bool,

    /// Input images in presentation order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Probe => cmd_probe(),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut store = FrameStore::new();
    for path in &args.images {
        let bytes =
            fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        store
            .append(bytes)
            .with_context(|| format!("accept image '{}'", path.display()))?;
    }

    let mut settings = match &args.settings {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read settings '{}'", path.display()))?;
            serde_json::from_str::<GifSettings>(&text)
                .with_context(|| format!("parse settings '{}'", path.display()))?
        }
        None => GifSettings::default(),
    };
    if args.settings.is_none()
        && args.width.is_none()
        && args.height.is_none()
        && let Some((w, h)) = store.first_dimensions()
    {
        settings = settings.sized_to(w, h);
    }
    if let Some(w) = args.width {
        settings.width = w;
    }
    if let Some(h) = args.height {
        settings.height = h;
    }
    if let Some(d) = args.delay_ms {
        settings.delay_ms = d;
    }
    if let Some(q) = args.quality {
        settings.quality = q;
    }
    if args.no_loop {
        settings.loop_mode = LoopMode::Once;
    }

    let snapshot = store.snapshot(&settings);
    let mut controller = GifController::new(FfmpegGifEncoder::new());
    controller.load_encoder()?;
    controller.generate(&snapshot)?;
    controller.pump();

    match controller.state() {
        ControllerState::Completed => {
            let bytes = controller
                .artifact()
                .context("artifact missing after completion (unexpected)")?;
            fs::write(&args.out, bytes.as_slice())
                .with_context(|| format!("write output '{}'", args.out.display()))?;
            println!(
                "wrote {} frames to '{}' ({} bytes)",
                snapshot.len(),
                args.out.display(),
                bytes.len()
            );
            Ok(())
        }
        ControllerState::Failed(reason) => bail!("{reason}"),
        other => bail!("unexpected controller state after render: {other:?}"),
    }
}

fn cmd_probe() -> anyhow::Result<()> {
    let mut encoder = FfmpegGifEncoder::new();
    encoder.load()?;
    match encoder.resource() {
        Some(resource) => println!("{}", resource.version),
        None => bail!("encoder loaded but reported no version (unexpected)"),
    }
    Ok(())
}
