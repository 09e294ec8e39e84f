//! Seeded sandbox games used by the `replay` and `soak` binaries.
//!
//! A scenario records a random but reproducible stream of commands against a
//! [`SandboxWorld`], then plays the resulting log back on a fresh world built
//! from the same seed.

use std::path::Path;

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use replay_core::command::resolve;
use replay_core::sandbox::{SandboxUnit, SandboxWorld};
use replay_core::{
    Action, CommandArgs, Dispatch, ReplayController, ReplayError, Simulation, StepOutcome,
};

const UNIT_TYPES: [&str; 4] = ["unit-footman", "unit-archer", "unit-peasant", "unit-mage"];
const TRAINABLE: [&str; 3] = ["unit-knight", "unit-ballista", "unit-peasant"];
const UPGRADES: [&str; 2] = ["upgrade-sword1", "upgrade-arrow1"];
const DIPLOMACY: [&str; 5] = ["allied", "neutral", "enemy", "crazy", "confused"];

fn choose<T: Clone>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p].clone()
}

/// A sandbox world seeded with `seed` and `units` units of mixed types.
pub fn sandbox_world(seed: u64, units: usize) -> (SandboxWorld, Vec<SandboxUnit>) {
    let mut world = SandboxWorld::new(seed);
    let spawned = (0..units).map(|i| world.spawn(UNIT_TYPES[i % UNIT_TYPES.len()])).collect();
    (world, spawned)
}

/// Record a command and run it, as the engine does for every issued order.
pub fn issue(
    controller: &mut ReplayController,
    world: &mut SandboxWorld,
    command: CommandArgs<'_, SandboxUnit>,
) {
    controller.record(&*world, command);
    let entry = controller.session().and_then(|session| session.entries().last()).cloned();
    if let Some(entry) = entry
        && let Ok(Dispatch::Send(command)) = resolve(&entry, &*world)
    {
        world.send(command);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GamePlan {
    pub world_seed: u64,
    pub command_seed: u64,
    pub units: usize,
    pub cycles: u64,
}

/// Play `plan` live with recording on. Returns the world as it ended.
pub fn record_random_game(controller: &mut ReplayController, plan: GamePlan) -> SandboxWorld {
    let (mut world, units) = sandbox_world(plan.world_seed, plan.units.max(1));
    let mut rng = ChaCha8Rng::seed_from_u64(plan.command_seed);
    controller.begin_recording(&world);

    for cycle in 0..plan.cycles {
        world.step_to(cycle);
        let burst = rng.next_u32() % 4;
        for _ in 0..burst {
            let unit = choose(&mut rng, &units);
            let target = choose(&mut rng, &units);
            let x = (rng.next_u32() % 128) as i32;
            let y = (rng.next_u32() % 128) as i32;
            let flush = (rng.next_u32() % 2) as i32;
            let trainee = choose(&mut rng, &TRAINABLE);
            let upgrade = choose(&mut rng, &UPGRADES);
            let stance = choose(&mut rng, &DIPLOMACY);
            let player = (rng.next_u32() % 4) as i32;
            let command = match rng.next_u32() % 14 {
                0 => CommandArgs::new(Action::Move).unit(&unit).flush(flush).at(x, y),
                1 => CommandArgs::new(Action::Attack)
                    .unit(&unit)
                    .flush(flush)
                    .at(x, y)
                    .target(&target),
                2 => CommandArgs::new(Action::AttackGround).unit(&unit).flush(flush).at(x, y),
                3 => CommandArgs::new(Action::Patrol).unit(&unit).flush(flush).at(x, y),
                4 => CommandArgs::new(Action::Follow).unit(&unit).flush(flush).target(&target),
                5 => {
                    CommandArgs::new(Action::Build).unit(&unit).flush(flush).at(x, y).value(trainee)
                }
                6 => CommandArgs::new(Action::Train).unit(&unit).flush(flush).value(trainee),
                7 => CommandArgs::new(Action::CancelTrain).unit(&unit).num(0).value(trainee),
                8 => CommandArgs::new(Action::Research).unit(&unit).flush(flush).value(upgrade),
                9 => {
                    CommandArgs::new(Action::SpellCast).unit(&unit).at(x, y).target(&target).num(1)
                }
                10 => CommandArgs::new(Action::Diplomacy).at(player, 0).value(stance),
                11 => CommandArgs::new(Action::SharedVision).at(player, 1).value("1"),
                12 => CommandArgs::new(Action::Chat).value("attack at dawn\nor dusk"),
                _ => CommandArgs::new(Action::Stop).unit(&unit),
            };
            issue(controller, &mut world, command);
        }
    }
    world
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackReport {
    pub last: StepOutcome,
    pub dispatched: usize,
    pub cycles: u64,
}

/// Start the log at `path` on `world` and step until playback ends or
/// `max_cycle` is passed.
pub fn play_log(
    controller: &mut ReplayController,
    world: &mut SandboxWorld,
    path: &Path,
    max_cycle: u64,
) -> Result<PlaybackReport, ReplayError> {
    controller.start(world, path, false)?;
    let mut report = PlaybackReport { last: StepOutcome::Inactive, dispatched: 0, cycles: 0 };
    for cycle in 0..=max_cycle {
        world.step_to(cycle);
        report.cycles = cycle;
        report.last = controller.advance(world);
        match report.last {
            StepOutcome::Dispatched { count } => report.dispatched += count,
            StepOutcome::Finished { dispatched } | StepOutcome::Desynced { dispatched, .. } => {
                report.dispatched += dispatched;
                break;
            }
            _ => {}
        }
    }
    Ok(report)
}
