use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use foreach_dispatch::{
    BufferView, BufferViewMut, ClipRange, DispatchContext, DispatchOpts, DispatchStats, Extents,
    Kernel, LaunchParams, ScriptCall, builtin,
};

#[derive(Parser, Debug)]
#[command(name = "foreach-dispatch", version)]
struct Cli {
    /// Print dispatch diagnostics (tracing, debug level) to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a stock kernel to a PNG image.
    Run(RunArgs),
    /// Time sequential against parallel execution of the gain kernel.
    Bench(BenchArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Kernel to run.
    #[arg(long, value_enum)]
    kernel: KernelChoice,

    /// Input PNG (not needed for `gradient`).
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas width for `gradient`.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Canvas height for `gradient`.
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Gain factor for `gain`.
    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Clip as `x_start,x_end,y_start,y_end`; an end of 0 keeps the whole axis.
    #[arg(long)]
    clip: Option<String>,

    #[command(flatten)]
    exec: ExecArgs,
}

#[derive(Parser, Debug)]
struct BenchArgs {
    /// Synthetic image width.
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Synthetic image height.
    #[arg(long, default_value_t = 1024)]
    height: u32,

    /// Timed launches per mode.
    #[arg(long, default_value_t = 5)]
    iterations: u32,

    #[command(flatten)]
    exec: ExecArgs,
}

#[derive(Parser, Debug)]
struct ExecArgs {
    /// Dispatch options JSON file.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Force sequential execution.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KernelChoice {
    Invert,
    Grayscale,
    Gain,
    Gradient,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Bench(args) => cmd_bench(args),
    }
}

fn load_opts(exec: &ExecArgs) -> anyhow::Result<DispatchOpts> {
    let mut opts = match &exec.opts {
        Some(path) => DispatchOpts::from_path(path)?,
        None => DispatchOpts::default(),
    };
    if exec.threads.is_some() {
        opts.threads = exec.threads;
    }
    if exec.sequential {
        opts.allow_parallel = false;
    }
    Ok(opts)
}

/// Parse `--clip`; inverted ranges and ends past the image are rejected.
fn parse_clip(s: &str, width: u32, height: u32) -> anyhow::Result<ClipRange> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse clip '{s}'"))?;
    let [x_start, x_end, y_start, y_end] = parts[..] else {
        anyhow::bail!("clip '{s}' must have 4 comma-separated values");
    };
    check_clip_axis("x", x_start, x_end, width)?;
    check_clip_axis("y", y_start, y_end, height)?;
    Ok(ClipRange::from(ScriptCall {
        x_start,
        x_end,
        y_start,
        y_end,
        ..ScriptCall::default()
    }))
}

fn check_clip_axis(name: &str, start: u32, end: u32, dim: u32) -> anyhow::Result<()> {
    if end == 0 {
        return Ok(());
    }
    if start > end {
        anyhow::bail!("clip {name} range {start}..{end} is inverted");
    }
    if end > dim {
        anyhow::bail!("clip {name} end {end} exceeds image size {dim}");
    }
    Ok(())
}

fn make_kernel(choice: KernelChoice, width: u32, height: u32) -> Box<dyn Kernel + Send> {
    match choice {
        KernelChoice::Invert => Box::new(builtin::invert_rgba8()),
        KernelChoice::Grayscale => Box::new(builtin::grayscale_rgba8()),
        KernelChoice::Gain => Box::new(builtin::gain_rgba8()),
        KernelChoice::Gradient => Box::new(builtin::gradient_rgba8(width, height)),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let ctx = DispatchContext::new(load_opts(&args.exec)?)?;
    let (width, height, input) = match (args.kernel, &args.in_path) {
        (KernelChoice::Gradient, _) => (args.width, args.height, None),
        (_, Some(path)) => {
            let img = image::open(path)
                .with_context(|| format!("open image '{}'", path.display()))?
                .to_rgba8();
            let (w, h) = img.dimensions();
            (w, h, Some(img.into_raw()))
        }
        (_, None) => anyhow::bail!("--in is required for kernel {:?}", args.kernel),
    };

    let clip = args
        .clip
        .as_deref()
        .map(|c| parse_clip(c, width, height))
        .transpose()?;
    let user = builtin::gain_params(args.gain);
    let mut launch = LaunchParams::new().with_user(&user);
    if let Some(clip) = clip {
        launch = launch.with_clip(clip);
    }

    let kernel = make_kernel(args.kernel, width, height);
    let extents = Extents::new_2d(width, height);
    // Clipped-out pixels keep their source value.
    let mut out = match &input {
        Some(px) => px.clone(),
        None => vec![0u8; width as usize * height as usize * builtin::RGBA8_BYTES],
    };

    let in_view = input
        .as_deref()
        .map(|px| BufferView::packed(px, extents, builtin::RGBA8_BYTES))
        .transpose()?;
    let out_view = BufferViewMut::packed(&mut out, extents, builtin::RGBA8_BYTES)?;
    let stats = ctx.dispatch(kernel.as_ref(), in_view, Some(out_view), &launch)?;

    write_png(&args.out, &out, width, height)?;
    println!("{}", serde_json::to_string(&stats)?);
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_bench(args: BenchArgs) -> anyhow::Result<()> {
    if args.iterations == 0 {
        anyhow::bail!("--iterations must be >= 1");
    }
    let opts = load_opts(&args.exec)?;
    let par = DispatchContext::new(opts.clone())?;
    let seq = DispatchContext::sequential();

    let extents = Extents::new_2d(args.width, args.height);
    let len = args.width as usize * args.height as usize * builtin::RGBA8_BYTES;
    let input: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
    let kernel = builtin::gain_rgba8();
    let user = builtin::gain_params(1.25);
    let launch = LaunchParams::new().with_user(&user);

    let run = |ctx: &DispatchContext| -> anyhow::Result<(Vec<u8>, f64, DispatchStats)> {
        let mut out = vec![0u8; len];
        let mut best = f64::INFINITY;
        let mut stats = None;
        for _ in 0..args.iterations {
            let in_view = BufferView::packed(&input, extents, builtin::RGBA8_BYTES)?;
            let out_view = BufferViewMut::packed(&mut out, extents, builtin::RGBA8_BYTES)?;
            let t0 = Instant::now();
            stats = Some(ctx.dispatch(&kernel, Some(in_view), Some(out_view), &launch)?);
            best = best.min(t0.elapsed().as_secs_f64() * 1000.0);
        }
        let stats = stats.context("bench ran no iterations")?;
        Ok((out, best, stats))
    };

    let (seq_out, seq_ms, seq_stats) = run(&seq)?;
    let (par_out, par_ms, par_stats) = run(&par)?;
    if seq_out != par_out {
        anyhow::bail!("sequential and parallel outputs differ");
    }

    let report = serde_json::json!({
        "width": args.width,
        "height": args.height,
        "workers": par.worker_count(),
        "opts": opts,
        "sequential": { "best_ms": seq_ms, "stats": seq_stats },
        "parallel": { "best_ms": par_ms, "stats": par_stats },
        "speedup": if par_ms > 0.0 { seq_ms / par_ms } else { 0.0 },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn write_png(path: &Path, rgba: &[u8], width: u32, height: u32) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        rgba,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}
