use anyhow::{Context, Result, bail};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use replay_core::{ReplayConfig, ReplayController, StepOutcome, SyncCheckMode};
use replay_tools::init_tracing;
use replay_tools::scenario::{GamePlan, play_log, record_random_game, sandbox_world};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Record and replay many seeded games", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 50)]
    games: u32,
    #[arg(short, long, default_value_t = 400)]
    cycles: u64,
    #[arg(short, long, default_value_t = 8)]
    units: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let dir = tempfile::tempdir().context("Failed to create scratch directory")?;
    let mut config = ReplayConfig::with_user_dir(dir.path());
    config.sync_check = SyncCheckMode::Strict;
    let mut controller = ReplayController::new(config);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    println!("Soaking {} games of {} cycles on seed {}...", args.games, args.cycles, args.seed);
    let mut total_entries = 0;
    for game in 0..args.games {
        let plan = GamePlan {
            world_seed: rng.next_u64(),
            command_seed: rng.next_u64(),
            units: args.units.max(1),
            cycles: args.cycles,
        };
        let mut recorded = record_random_game(&mut controller, plan);
        let entries = controller.session().map(|session| session.len()).unwrap_or_default();
        let saved = controller
            .save(&format!("soak_{game}.log"))
            .with_context(|| format!("Game {game}: failed to save replay"))?;
        controller.clean();

        let (mut viewer, _) = sandbox_world(plan.world_seed, plan.units);
        let report = play_log(&mut controller, &mut viewer, &saved, plan.cycles)
            .with_context(|| format!("Game {game}: failed to load {}", saved.display()))?;
        controller.clean();

        match report.last {
            StepOutcome::Finished { .. } => {}
            StepOutcome::Desynced { cycle, .. } => {
                bail!("Game {game} ({plan:?}) went out of sync at cycle {cycle}")
            }
            other => bail!("Game {game} ({plan:?}) did not finish: {other:?}"),
        }
        if report.dispatched != entries {
            bail!("Game {game}: recorded {entries} commands but replayed {}", report.dispatched);
        }
        viewer.step_to(plan.cycles);
        recorded.step_to(plan.cycles);
        if viewer.state_hash() != recorded.state_hash() {
            bail!(
                "Game {game}: state hash mismatch {:#018x} != {:#018x}",
                viewer.state_hash(),
                recorded.state_hash()
            );
        }
        info!(game, entries, "replay matched");
        total_entries += entries;
    }

    println!("All {} games replayed identically ({total_entries} commands).", args.games);
    Ok(())
}
