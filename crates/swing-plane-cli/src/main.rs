//! `swing-plane` command-line tool.
//!
//! Runs the swing-plane analysis over a pose JSON document, optional frame
//! images and optional recorded vision answers, and writes the report JSON.

mod frames;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use swing_plane::{
    AnalysisConfig, PoseSequence, RecordedVision, SwingAnalyzer, SwingInput, SwingIoError,
};
use swing_plane_core::Handedness;

use crate::frames::{attach_images, FrameLoadError};

#[derive(Parser, Debug)]
#[command(name = "swing-plane", version, about = "Golf swing-plane analysis")]
struct Cli {
    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    /// Emit JSON log lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one swing and write the report JSON.
    Analyze(AnalyzeArgs),
    /// Write a config template with the default parameters.
    InitConfig {
        /// Destination of the config JSON.
        #[arg(long, short)]
        out: PathBuf,
        /// Pose document the config points at.
        #[arg(long, default_value = "poses.json")]
        poses: String,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Analysis config JSON; command-line flags override its fields.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Pose document `{"frames": [{"idx", "t", "pose", "image"}]}`.
    #[arg(long)]
    poses: Option<PathBuf>,
    /// Recorded vision answers keyed by prompt kind and frame index.
    #[arg(long)]
    vision: Option<PathBuf>,
    /// Report destination; `-` prints to stdout.
    #[arg(long, short)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    handedness: Option<HandArg>,
    /// 1-based frame index of the top of the backswing.
    #[arg(long)]
    top: Option<u32>,
    /// 1-based frame index of impact.
    #[arg(long)]
    impact: Option<u32>,
    /// Fail when a frame image cannot be decoded.
    #[arg(long)]
    strict_images: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum HandArg {
    Right,
    Left,
}

impl From<HandArg> for Handedness {
    fn from(h: HandArg) -> Self {
        match h {
            HandArg::Right => Handedness::Right,
            HandArg::Left => Handedness::Left,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] SwingIoError),
    #[error(transparent)]
    Frames(#[from] FrameLoadError),
    #[error("{0}")]
    Usage(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.into(), cli.json_logs);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: LevelFilter, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        swing_plane_core::init_tracing(level, json);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("warning: --json-logs needs the `tracing` feature; using plain logs");
        }
        let _ = swing_plane_core::init_with_level(level);
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Analyze(args) => analyze(args),
        Command::InitConfig { out, poses } => {
            let cfg = AnalysisConfig {
                pose_path: poses,
                vision_path: None,
                output_path: None,
                handedness: Some(Handedness::Right),
                top_frame: 1,
                impact_frame: 1,
                params: Some(Default::default()),
            };
            cfg.write_json(&out)?;
            println!("wrote config template to {}", out.display());
            Ok(())
        }
    }
}

/// Paths in a config file are relative to that file.
fn rebase(cfg: &mut AnalysisConfig, base: &Path) {
    let join = |p: &str| base.join(p).display().to_string();
    cfg.pose_path = join(&cfg.pose_path);
    cfg.vision_path = cfg.vision_path.as_deref().map(join);
    cfg.output_path = cfg.output_path.as_deref().map(join);
}

/// Merge the config file with the command-line overrides.
fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig, CliError> {
    let mut cfg = match &args.config {
        Some(path) => {
            let mut cfg = AnalysisConfig::load_json(path)?;
            rebase(&mut cfg, path.parent().unwrap_or(Path::new("")));
            cfg
        }
        None => {
            let (Some(top), Some(impact)) = (args.top, args.impact) else {
                return Err(CliError::Usage(
                    "without --config both --top and --impact are required".into(),
                ));
            };
            let Some(poses) = &args.poses else {
                return Err(CliError::Usage("either --config or --poses is required".into()));
            };
            AnalysisConfig {
                pose_path: poses.display().to_string(),
                vision_path: None,
                output_path: None,
                handedness: None,
                top_frame: top,
                impact_frame: impact,
                params: None,
            }
        }
    };
    if let Some(poses) = &args.poses {
        cfg.pose_path = poses.display().to_string();
    }
    if let Some(vision) = &args.vision {
        cfg.vision_path = Some(vision.display().to_string());
    }
    if let Some(out) = &args.out {
        cfg.output_path = Some(out.display().to_string());
    }
    if let Some(h) = args.handedness {
        cfg.handedness = Some(h.into());
    }
    if let Some(top) = args.top {
        cfg.top_frame = top;
    }
    if let Some(impact) = args.impact {
        cfg.impact_frame = impact;
    }
    Ok(cfg)
}

fn analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let cfg = resolve_config(&args)?;
    let pose_path = PathBuf::from(&cfg.pose_path);
    let mut seq = PoseSequence::load_json(&pose_path)?;
    let image_base = pose_path.parent().map(Path::to_path_buf).unwrap_or_default();
    attach_images(&mut seq, &image_base, args.strict_images)?;
    let vision = cfg
        .vision_path
        .as_deref()
        .map(RecordedVision::load_json)
        .transpose()?;
    info!(
        "analyzing {} frames (top {}, impact {})",
        seq.len(),
        cfg.top_frame,
        cfg.impact_frame
    );

    let mut analyzer = SwingAnalyzer::new(cfg.build_params());
    if let Some(v) = &vision {
        analyzer = analyzer.with_vision(v);
    }
    let report = analyzer.analyze(&SwingInput {
        frames: &seq.frames,
        poses: &seq.poses,
        phases: cfg.phases(),
        handedness: cfg.handedness,
    });

    let out = cfg.output_path();
    if out.as_os_str() == "-" {
        println!("{}", report.to_json()?);
    } else {
        report.write_json(&out)?;
        println!("wrote report to {}", out.display());
    }
    Ok(())
}
