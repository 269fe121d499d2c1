mod app;
mod host;
mod input;
mod media;

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use anyhow::{bail, Context, Result};
use clap::Parser;
use gatejudge_experiment::ExperimentConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::host::FileHost;

/// Tried in order when `--font` is not given.
const FONT_CANDIDATES: &[&str] = &[
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Causal judgment experiment runner", long_about = None)]
struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        help = "Experiment configuration (JSON); built-in defaults when omitted"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        default_value = "data",
        help = "Directory session files are written to"
    )]
    output: PathBuf,

    #[arg(long, value_name = "PATH", help = "TrueType font used for all text")]
    font: Option<PathBuf>,

    #[arg(long, help = "Participant id; a random one is generated when omitted")]
    participant: Option<String>,

    #[arg(long, help = "Override the configured condition")]
    condition: Option<u32>,

    #[arg(long, help = "Override the configured counterbalance")]
    counterbalance: Option<u32>,

    #[arg(long, help = "Run in a 1280x800 window instead of fullscreen")]
    windowed: bool,
}

fn load_font(path: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = path {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        return FontArc::try_from_vec(bytes)
            .with_context(|| format!("{} is not a usable font", path.display()));
    }
    for candidate in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(candidate) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                info!(font = candidate, "using system font");
                return Ok(font);
            }
        }
    }
    bail!("no usable font found, pass one with --font")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(condition) = cli.condition {
        config.condition = condition;
    }
    if let Some(counterbalance) = cli.counterbalance {
        config.counterbalance = counterbalance;
    }

    let participant = cli
        .participant
        .unwrap_or_else(|| format!("p{:08x}", rand::random::<u32>()));
    info!(
        %participant,
        condition = config.condition,
        counterbalance = config.counterbalance,
        trials = config.trials.len(),
        variant = ?config.variant,
        "configuration loaded"
    );

    let host = FileHost::new(&cli.output, &participant)?;
    let font = load_font(cli.font.as_deref())?;
    App::new(config, host, font, cli.windowed).run()
}
