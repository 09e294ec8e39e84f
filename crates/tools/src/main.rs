use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use replay_core::log_file::entry_to_line;
use replay_core::sandbox::{SANDBOX_ENGINE, SANDBOX_PROTOCOL};
use replay_core::{
    GameState, ReplayConfig, ReplayController, ReplaySession, StepOutcome, SyncCheckMode,
    load_session_from_file,
};
use replay_tools::init_tracing;
use replay_tools::scenario::{GamePlan, play_log, record_random_game, sandbox_world};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Inspect, validate, record and play replay logs",
    long_about = None
)]
struct Args {
    /// Optional replay config (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a log's header and a summary of its entries
    Inspect {
        log: PathBuf,
        /// Also print every entry line
        #[arg(long)]
        entries: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a log and exit non-zero if it does not load
    Check { log: PathBuf },
    /// Record a seeded sandbox game and save its log under `name`
    Record {
        name: String,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 7)]
        commands: u64,
        #[arg(short, long, default_value_t = 6)]
        units: usize,
        #[arg(long, default_value_t = 500)]
        cycles: u64,
    },
    /// Play a log against a sandbox world built from `seed`
    Play {
        log: PathBuf,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 6)]
        units: usize,
        /// Stop at the first sync mismatch instead of reporting and continuing
        #[arg(long)]
        strict: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ReplayConfig> {
    match path {
        Some(path) => ReplayConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(ReplayConfig::default()),
    }
}

fn load_log(path: &PathBuf) -> Result<ReplaySession> {
    load_session_from_file(path)
        .with_context(|| format!("Failed to load replay log: {}", path.display()))
}

fn inspect(path: &PathBuf, entries: bool, json: bool) -> Result<()> {
    let session = load_log(path)?;
    let header = &session.header;
    let mut actions: BTreeMap<String, usize> = BTreeMap::new();
    for entry in session.entries() {
        *actions.entry(entry.action.tag().to_string()).or_default() += 1;
    }
    let first_cycle = session.entries().first().map(|entry| entry.cycle);
    let players: Vec<(usize, &str)> = header
        .player_names
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(slot, name)| (slot, name.as_str()))
        .collect();
    let compatibility = session.compatibility(SANDBOX_ENGINE, SANDBOX_PROTOCOL);

    if json {
        let summary = serde_json::json!({
            "date": header.date,
            "map": header.map.description,
            "map_path": header.map.path,
            "map_id": header.map.uid,
            "local_player": header.local_player,
            "players": players,
            "multiplayer": session.is_multiplayer(),
            "engine": header.engine.to_string(),
            "protocol": header.protocol.to_string(),
            "entries": session.len(),
            "first_cycle": first_cycle,
            "last_cycle": session.last_cycle(),
            "actions": actions,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for comment in header.comments.iter().filter(|comment| !comment.is_empty()) {
            println!("# {comment}");
        }
        println!("Date: {}", header.date);
        let map = &header.map;
        println!("Map: {} ({}, id {:#010x})", map.description, map.path, map.uid);
        println!("Local player: {}", header.local_player);
        for (slot, name) in &players {
            println!("  player {slot}: {name}");
        }
        let mode = if session.is_multiplayer() { "multiplayer" } else { "single player" };
        println!("Mode: {mode}");
        println!(
            "Engine: {} ({})",
            header.engine,
            if compatibility.engine_matches { "matches sandbox" } else { "differs from sandbox" }
        );
        println!("Protocol: {}", header.protocol);
        match (first_cycle, session.last_cycle()) {
            (Some(first), Some(last)) => {
                println!("Entries: {} over cycles {first}..={last}", session.len());
            }
            _ => println!("Entries: 0"),
        }
        for (action, count) in &actions {
            println!("  {action:<20} {count}");
        }
    }

    if entries {
        for entry in session.entries() {
            println!("{}", entry_to_line(entry)?);
        }
    }
    Ok(())
}

fn record(config: ReplayConfig, name: &str, plan: GamePlan) -> Result<()> {
    let mut controller = ReplayController::new(config);
    let world = record_random_game(&mut controller, plan);
    let entries = controller.session().map(ReplaySession::len).unwrap_or_default();
    let saved = controller.save(name).context("Failed to save replay")?;
    controller.clean();
    println!("Recorded {entries} commands over {} cycles.", world.current_cycle() + 1);
    println!("Saved: {}", saved.display());
    println!("State Hash: {:#018x}", world.state_hash());
    Ok(())
}

fn play(
    mut config: ReplayConfig,
    path: &PathBuf,
    seed: u64,
    units: usize,
    strict: bool,
) -> Result<()> {
    if strict {
        config.sync_check = SyncCheckMode::Strict;
    }
    let last_cycle = load_log(path)?.last_cycle().unwrap_or_default();
    let mut controller = ReplayController::new(config);
    let (mut world, _) = sandbox_world(seed, units);
    let report = play_log(&mut controller, &mut world, path, last_cycle)
        .with_context(|| format!("Failed to start replay: {}", path.display()))?;

    println!("Playback complete.");
    println!("Last Cycle: {}", report.cycles);
    println!("Dispatched: {}", report.dispatched);
    println!("Desyncs: {}", controller.player().desync_count());
    println!("State Hash: {:#018x}", world.state_hash());
    controller.clean();

    match report.last {
        StepOutcome::Finished { .. } => Ok(()),
        StepOutcome::Desynced { cycle, .. } => bail!("Replay went out of sync at cycle {cycle}"),
        other => bail!("Replay did not finish: {other:?}"),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Inspect { log, entries, json } => inspect(&log, entries, json),
        Command::Check { log } => {
            let session = load_log(&log)?;
            println!("OK: {} entries", session.len());
            Ok(())
        }
        Command::Record { name, seed, commands, units, cycles } => {
            let plan = GamePlan { world_seed: seed, command_seed: commands, units, cycles };
            record(config, &name, plan)
        }
        Command::Play { log, seed, units, strict } => play(config, &log, seed, units, strict),
    }
}
