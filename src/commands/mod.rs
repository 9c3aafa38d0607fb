use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use gridrunner::{
    CycleStrategy, DEFAULT_STATE_DIR, EngineConfig, load_mode_stats, reset_mode_stats, state,
};

mod cycle;
mod play;

use cycle::run_cycle;
use play::{PlayArgs, run_play};

#[derive(Parser)]
#[command(
    name = "gridrunner",
    version,
    about = "Self-steering grid agent (A* routes, fallback tour, value learning)",
    long_about = None
)]
pub struct Cli {
    /// Directory holding state.json, stats.json and snapshot.json
    #[arg(long, global = true, default_value = DEFAULT_STATE_DIR)]
    pub state_dir: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize local state (high score, stats)
    Init,
    /// Play one or more headless games
    Play(PlayArgs),
    /// Print and verify the fallback tour for a grid size
    Cycle {
        #[arg(long, default_value_t = 6)]
        width: u32,
        #[arg(long, default_value_t = 6)]
        height: u32,
        #[arg(long, default_value_t = CycleStrategy::Boustrophedon, value_enum)]
        strategy: CycleStrategy,
        /// Also list the tour cells in order
        #[arg(long)]
        list: bool,
    },
    /// Show high score, games played and per-grid mode statistics
    Status,
}

/// Engine settings shared by subcommands that build an agent. Flags override the file.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// JSON engine config; flags below override its fields
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    /// Fallback tour layout
    #[arg(long, value_enum)]
    pub cycle: Option<CycleStrategy>,
    /// RNG seed for goal placement and exploration
    #[arg(long)]
    pub seed: Option<u64>,
    /// Ignore routes and follow the fallback tour every tick
    #[arg(long)]
    pub force_fallback: bool,
    /// Learning rate in (0, 1]
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Discount factor in (0, 1]
    #[arg(long)]
    pub gamma: Option<f64>,
    /// Break ties between equally short routes by learned value
    #[arg(long)]
    pub bias_tie_breaks: bool,
}

impl EngineArgs {
    pub fn resolve(&self) -> Result<EngineConfig, String> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(cycle) = self.cycle {
            config.cycle = cycle;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(alpha) = self.alpha {
            config.learning.alpha = alpha;
        }
        if let Some(gamma) = self.gamma {
            config.learning.gamma = gamma;
        }
        config.force_fallback |= self.force_fallback;
        config.learning.bias_tie_breaks |= self.bias_tie_breaks;
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = dispatch(&cli.state_dir, cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(state_dir: &Path, command: Command) -> Result<(), String> {
    match command {
        Command::Init => run_init(state_dir),
        Command::Play(args) => run_play(state_dir, args),
        Command::Cycle {
            width,
            height,
            strategy,
            list,
        } => run_cycle(width, height, strategy, list),
        Command::Status => run_status(state_dir),
    }
}

fn run_init(state_dir: &Path) -> Result<(), String> {
    state::init_state(state_dir).map_err(|e| e.to_string())?;
    reset_mode_stats(state_dir).map_err(|e| format!("reset stats: {}", e))?;
    println!(
        "Initialized state at {}",
        state::state_file_path(state_dir).display()
    );
    Ok(())
}

fn run_status(state_dir: &Path) -> Result<(), String> {
    let Some(run) = state::load_state(state_dir).map_err(|e| e.to_string())? else {
        println!("Status: not initialized. Run `gridrunner init`.");
        return Ok(());
    };

    println!(
        "High score: {} | games={} | ticks={} | last={} ({}) | played={}",
        run.high_score,
        run.games_played,
        run.total_ticks,
        run.last_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into()),
        run.last_outcome
            .map(|o| o.to_string())
            .unwrap_or_else(|| "unfinished".into()),
        run.last_played
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into()),
    );

    let stats = load_mode_stats(state_dir).map_err(|e| e.to_string())?;
    if stats.per_grid.is_empty() {
        println!("No mode statistics recorded.");
        return Ok(());
    }
    println!("Mode statistics:");
    for (grid, s) in &stats.per_grid {
        println!(
            "  {:>7}: seeking={} fallback={} manual={} | captures={} wall={} self={} full={}",
            grid,
            s.seeking_ticks,
            s.fallback_ticks,
            s.manual_ticks,
            s.captures,
            s.wall_crashes,
            s.self_collisions,
            s.boards_filled
        );
    }
    Ok(())
}
