use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use lyricframe::{
    Canvas, DirFontResolver, FontResolver, FontSpec, Fps, FrameIndex, RenderOpts, RenderRequest,
    RenderSession, StyleConfig, SystemFontResolver, Transcript,
};

#[derive(Parser, Debug)]
#[command(name = "lyricframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a lyric video muxed with its audio (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Report transcript inconsistencies and the resulting video length.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Style JSON; flags below override its fields.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Font file to render with.
    #[arg(long, conflicts_with = "font_name")]
    font: Option<PathBuf>,

    /// Font family name, resolved through `--font-dir` or the installed system fonts.
    #[arg(long)]
    font_name: Option<String>,

    /// Font category passed to the resolver.
    #[arg(long, default_value = "")]
    font_category: String,

    /// Directory of cached `.ttf`/`.otf` files searched for `--font-name`.
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Font size in pixels.
    #[arg(long)]
    font_size: Option<f32>,

    /// Background image, scaled to the canvas.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Canvas width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

impl StyleArgs {
    fn load(&self) -> anyhow::Result<StyleConfig> {
        let mut style = match &self.style {
            Some(path) => StyleConfig::from_path(path)?,
            None => StyleConfig::default(),
        };
        if let Some(path) = &self.font {
            style.font = FontSpec::Path(path.clone());
        }
        if let Some(name) = &self.font_name {
            style.font = FontSpec::Catalog {
                category: self.font_category.clone(),
                name: name.clone(),
            };
        }
        if let Some(size) = self.font_size {
            style.font_size_px = size;
        }
        if let Some(path) = &self.background {
            style.background = Some(path.clone());
        }
        if let Some(fps) = self.fps {
            style.fps = Fps::new(fps, 1)?;
        }
        style.canvas = Canvas {
            width: self.width.unwrap_or(style.canvas.width),
            height: self.height.unwrap_or(style.canvas.height),
        };
        style.validate()?;
        Ok(style)
    }

    fn resolver(&self) -> Option<Arc<dyn FontResolver>> {
        self.font_name.as_ref()?;
        let resolver: Arc<dyn FontResolver> = match &self.font_dir {
            Some(dir) => Arc::new(DirFontResolver::new(dir)),
            None => Arc::new(SystemFontResolver::new()),
        };
        Some(resolver)
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Word-timed transcript JSON.
    #[arg(long)]
    transcript: PathBuf,

    /// Audio track to mux in.
    #[arg(long)]
    audio: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    style: StyleArgs,

    /// Refuse to replace an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Render frames on the calling thread only.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Render chunk size.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Render every frame even when it repeats the previous word states.
    #[arg(long, default_value_t = false)]
    no_elision: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Word-timed transcript JSON.
    #[arg(long)]
    transcript: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Playback time in seconds.
    #[arg(long, conflicts_with = "frame")]
    time: Option<f64>,

    /// Frame index (0-based).
    #[arg(long)]
    frame: Option<u64>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Word-timed transcript JSON.
    #[arg(long)]
    transcript: PathBuf,

    /// Frames per second used for the frame count.
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let transcript = Transcript::from_path(&args.transcript)?;
    let style = args.style.load()?;
    let opts = RenderOpts {
        parallel: !args.sequential,
        chunk_size: args.chunk_size,
        threads: args.threads,
        static_frame_elision: !args.no_elision,
        font_resolver: args.style.resolver(),
        overwrite: !args.no_overwrite,
        ..RenderOpts::default()
    };

    let report = lyricframe::render(
        RenderRequest {
            transcript,
            style,
            audio: args.audio,
            out_path: args.out,
        },
        opts,
    )?;

    eprintln!(
        "wrote {} ({} frames, {} rendered)",
        report.path.display(),
        report.stats.frames_total,
        report.stats.frames_rendered
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let transcript = Transcript::from_path(&args.transcript)?;
    let style = args.style.load()?;
    let opts = RenderOpts {
        font_resolver: args.style.resolver(),
        ..RenderOpts::default()
    };
    let sess = RenderSession::new(&transcript, &style, opts)?;

    let frame = match (args.time, args.frame) {
        (Some(t), _) => sess.render_at(t)?,
        (None, Some(f)) => sess.render_frame(FrameIndex(f))?,
        (None, None) => anyhow::bail!("one of --time or --frame is required"),
    };

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    // Flatten over black, matching what the video stream shows.
    let rgba = frame.to_opaque_rgba8([0, 0, 0]);
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let transcript = Transcript::from_path(&args.transcript)?;
    let fps = Fps::new(args.fps, 1)?;
    let issues = transcript.diagnose();
    for issue in &issues {
        println!("{}: {issue}", args.transcript.display());
    }

    let secs = transcript.output_duration_secs();
    println!(
        "{} segments, {:.2}s, {} frames at {} fps, {} issue(s)",
        transcript.segments.len(),
        secs,
        fps.secs_to_frames_floor(secs),
        args.fps,
        issues.len()
    );
    Ok(())
}
