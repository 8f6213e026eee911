//! audplay - render a YAML graph description to the speakers or a WAV file
//!
//! Run with: cargo run --bin audplay -- graph.yaml [--out bounce.wav] [--frames N]
//!           [--rate HZ] [--channels N] [--format s16|s24|s32|float32]

mod app;

use color_eyre::eyre::{bail, eyre, Result as EyreResult, WrapErr};
use std::path::PathBuf;

use app::Audplay;
use audspace::{config::GraphConfig, SampleFormat};

const USAGE: &str = "usage: audplay <graph.yaml> [--out <file.wav>] [--frames <n>] \
                     [--rate <hz>] [--channels <n>] [--format <s16|s24|s32|float32>]";

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    graph: PathBuf,
    out: Option<PathBuf>,
    frames: Option<u64>,
    rate: Option<u32>,
    channels: Option<u16>,
    format: Option<SampleFormat>,
}

fn parse_format(value: &str) -> EyreResult<SampleFormat> {
    Ok(match value {
        "u8" => SampleFormat::U8,
        "s16" => SampleFormat::S16,
        "s24" => SampleFormat::S24,
        "s32" => SampleFormat::S32,
        "float32" | "f32" => SampleFormat::Float32,
        "float64" | "f64" => SampleFormat::Float64,
        other => bail!("unknown sample format '{other}'"),
    })
}

fn parse_args(mut args: impl Iterator<Item = String>) -> EyreResult<Args> {
    let mut parsed = Args::default();
    let mut graph = None;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| eyre!("{flag} needs a value\n{USAGE}"))
        };
        match arg.as_str() {
            "--out" | "-o" => parsed.out = Some(PathBuf::from(value("--out")?)),
            "--frames" => parsed.frames = Some(value("--frames")?.parse().wrap_err("--frames")?),
            "--rate" => parsed.rate = Some(value("--rate")?.parse().wrap_err("--rate")?),
            "--channels" => {
                parsed.channels = Some(value("--channels")?.parse().wrap_err("--channels")?)
            }
            "--format" => parsed.format = Some(parse_format(&value("--format")?)?),
            "--help" | "-h" => bail!("{USAGE}"),
            flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
            path if graph.is_none() => graph = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument '{extra}'\n{USAGE}"),
        }
    }

    parsed.graph = graph.ok_or_else(|| eyre!("{USAGE}"))?;
    Ok(parsed)
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = GraphConfig::load(&args.graph)
        .wrap_err_with(|| format!("failed to load {}", args.graph.display()))?;
    let factory = config.build().wrap_err("failed to build graph")?;

    let app = Audplay::new(factory)
        .rate(args.rate)
        .channels(args.channels)
        .format(args.format)
        .frames(args.frames);

    match args.out {
        Some(path) => app.bounce(&path),
        None => app.play(),
    }
}
