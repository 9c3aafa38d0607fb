use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use gridrunner::{
    AgentHandle, TickEvent, TickResult, load_mode_stats, save_mode_stats, save_snapshot, state,
};

use super::EngineArgs;

/// Who steers when a route exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Shortest route, fallback tour when there is none
    #[default]
    Route,
    /// Epsilon-greedy pick from the learned table, fed in as a manual direction
    Learned,
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Number of games to play
    #[arg(short = 'g', long, default_value_t = 1)]
    pub games: u32,
    /// Tick budget per game
    #[arg(short = 't', long, default_value_t = 10_000)]
    pub max_ticks: u64,
    #[arg(long, default_value_t = Policy::Route, value_enum)]
    pub policy: Policy,
    /// Print the board after every tick
    #[arg(long)]
    pub show: bool,
    /// Delay between ticks in milliseconds (only with --show)
    #[arg(short = 'd', long, default_value_t = 0)]
    pub delay_ms: u64,
    /// Value table file; loaded before the first game if present, written after the last
    #[arg(long, value_name = "FILE")]
    pub values: Option<PathBuf>,
}

pub fn run_play(state_dir: &Path, args: PlayArgs) -> Result<(), String> {
    let config = args.engine.resolve()?;
    let mut agent = AgentHandle::reset(&config).map_err(|e| e.to_string())?;

    if let Some(run) = state::load_state(state_dir).map_err(|e| e.to_string())? {
        agent.set_high_score(run.high_score);
    }
    if let Some(path) = &args.values {
        if let Some(table) = state::load_values(path).map_err(|e| e.to_string())? {
            agent
                .import_values(table)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            println!("Loaded value table from {}", path.display());
        }
    }

    let mut stats = load_mode_stats(state_dir).map_err(|e| e.to_string())?;
    let delay = Duration::from_millis(args.delay_ms);

    for game in 1..=args.games {
        if game > 1 {
            agent.restart();
        }

        for _ in 0..args.max_ticks {
            let manual = match args.policy {
                Policy::Route => None,
                Policy::Learned => agent.suggest_direction(),
            };
            let result = agent.tick(manual);
            stats.grid_mut(config.width, config.height).record(&result);

            if args.show {
                print_tick(&result, &agent);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            if result.new_high_score {
                println!("New high score: {}", result.score);
            }

            if result.event.is_terminal() {
                break;
            }
        }

        let ticks = agent.ticks();
        let outcome = agent.outcome();
        let run = state::record_game(state_dir, agent.score(), ticks, outcome)
            .map_err(|e| e.to_string())?;
        println!(
            "game {}/{}: score={} ticks={} length={} outcome={} | high score {}",
            game,
            args.games,
            agent.score(),
            ticks,
            agent.chain().len(),
            outcome
                .map(|o| o.to_string())
                .unwrap_or_else(|| "tick budget".into()),
            run.high_score
        );
    }

    save_mode_stats(state_dir, &stats).map_err(|e| format!("save stats: {}", e))?;
    let path = save_snapshot(state_dir, &agent.snapshot()).map_err(|e| e.to_string())?;
    println!("Snapshot written to {}", path.display());

    if let Some(path) = &args.values {
        state::save_values(path, agent.value_table()).map_err(|e| e.to_string())?;
        println!(
            "Saved value table ({} learned entries) to {}",
            agent.value_table().touched(),
            path.display()
        );
    }
    Ok(())
}

fn print_tick(result: &TickResult, agent: &AgentHandle) {
    let event = match result.event {
        TickEvent::Continue => "-".to_string(),
        TickEvent::Captured => "captured".to_string(),
        TickEvent::Terminated(reason) => format!("terminated ({})", reason),
    };
    println!(
        "--- tick {} | mode={} | score={} | head={} | {}",
        result.tick, result.mode, result.score, result.head, event
    );
    print!("{}", agent.snapshot().render());
}
