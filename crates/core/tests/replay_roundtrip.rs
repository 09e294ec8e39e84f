use std::fs;

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use replay_core::sandbox::{SandboxUnit, SandboxWorld};
use replay_core::{
    Action, CommandArgs, Dispatch, GameState, ReplayConfig, ReplayController, ReplayError,
    Simulation, StepOutcome, SyncCheckMode, command::resolve, load_session_from_file,
};

const UNIT_TYPES: [&str; 3] = ["unit-footman", "unit-archer", "unit-peasant"];

fn choose<T: Clone>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p].clone()
}

fn world(seed: u64) -> (SandboxWorld, Vec<SandboxUnit>) {
    let mut world = SandboxWorld::new(seed);
    let units = (0..6).map(|i| world.spawn(UNIT_TYPES[i % UNIT_TYPES.len()])).collect();
    (world, units)
}

fn issue(
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

/// Play `cycles` cycles issuing a random burst of commands on some of them.
fn record_random_game(controller: &mut ReplayController, seed: u64, cycles: u64) -> SandboxWorld {
    let (mut world, units) = world(seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0xabcd);
    controller.begin_recording(&world);
    for cycle in 0..cycles {
        world.step_to(cycle);
        let burst = rng.next_u32() % 4;
        for _ in 0..burst {
            let unit = choose(&mut rng, &units);
            let target = choose(&mut rng, &units);
            let x = (rng.next_u32() % 64) as i32;
            let y = (rng.next_u32() % 64) as i32;
            let command = match rng.next_u32() % 6 {
                0 => CommandArgs::new(Action::Move).unit(&unit).flush(1).at(x, y),
                1 => CommandArgs::new(Action::Attack).unit(&unit).at(x, y).target(&target),
                2 => CommandArgs::new(Action::Train).unit(&unit).value("unit-knight"),
                3 => CommandArgs::new(Action::Chat).value("attack at dawn\nor dusk"),
                4 => CommandArgs::new(Action::Stop).unit(&unit),
                _ => CommandArgs::new(Action::Follow).unit(&unit).target(&target).flush(0),
            };
            issue(controller, &mut world, command);
        }
    }
    world
}

/// Record a game to a file, reload it and replay it on a fresh world.
/// Both worlds must end in the same state.
#[test]
fn file_replay_reproduces_the_recorded_game() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ReplayConfig::with_user_dir(dir.path());
    config.sync_check = SyncCheckMode::Strict;
    let mut controller = ReplayController::new(config);

    let cycles = 200;
    let mut recorded = record_random_game(&mut controller, 2024, cycles);
    let entries = controller.session().map(|session| session.len()).unwrap_or_default();
    assert!(entries > 100, "expected a busy game, got {entries} entries");
    let saved = controller.save("random.log").unwrap();
    controller.clean();

    let (mut viewer, _) = world(2024);
    controller.start(&mut viewer, &saved, false).unwrap();
    let mut finished = false;
    for cycle in 0..=cycles {
        viewer.step_to(cycle);
        match controller.advance(&mut viewer) {
            StepOutcome::Desynced { cycle, .. } => panic!("replay desynced at cycle {cycle}"),
            StepOutcome::Finished { .. } => finished = true,
            _ => {}
        }
    }
    assert!(finished, "replay did not reach the end of the log");
    assert_eq!(controller.player().desync_count(), 0);

    recorded.step_to(cycles);
    assert_eq!(viewer.sent(), recorded.sent());
    assert_eq!(
        viewer.state_hash(),
        recorded.state_hash(),
        "file replay must reproduce the recorded state"
    );
}

/// A different starting seed must be caught on the first entry.
#[test]
fn replay_on_a_different_world_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ReplayConfig::with_user_dir(dir.path());
    config.sync_check = SyncCheckMode::Strict;
    let mut controller = ReplayController::new(config);
    record_random_game(&mut controller, 7, 50);
    let saved = controller.save("seven.log").unwrap();
    controller.clean();

    let (mut viewer, _) = world(8);
    controller.start(&mut viewer, &saved, false).unwrap();
    let mut outcome = StepOutcome::Inactive;
    for cycle in 0..=50 {
        viewer.step_to(cycle);
        outcome = controller.advance(&mut viewer);
        if outcome.ended() {
            break;
        }
    }
    assert!(matches!(outcome, StepOutcome::Desynced { dispatched: 0, .. }), "got {outcome:?}");
    assert!(viewer.sent().is_empty());
    assert!(!controller.is_observing());
}

/// Corrupt one record in the middle of a log and confirm loading reports it.
#[test]
fn corrupted_log_reports_the_bad_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = ReplayController::new(ReplayConfig::with_user_dir(dir.path()));
    record_random_game(&mut controller, 99, 40);
    let path = controller.last_log_path().unwrap().to_path_buf();
    controller.clean();

    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    assert!(lines.len() > 5);
    lines[4] = r#"{"GameCycle":"soon","Action":"stop"}"#;
    fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();

    let result = load_session_from_file(&path);
    assert!(matches!(result, Err(ReplayError::InvalidRecord { line: 5, .. })), "got {result:?}");

    let mut viewer = SandboxWorld::new(99);
    let result = controller.start(&mut viewer, &path, false);
    assert!(matches!(result, Err(ReplayError::InvalidRecord { line: 5, .. })), "got {result:?}");
    assert!(!controller.is_replay_game());
}

/// A crash mid-write leaves a partial last line; the log is refused whole.
#[test]
fn truncated_log_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = ReplayController::new(ReplayConfig::with_user_dir(dir.path()));
    record_random_game(&mut controller, 5, 30);
    let path = controller.last_log_path().unwrap().to_path_buf();
    controller.clean();

    let content = fs::read_to_string(&path).unwrap();
    let line_count = content.lines().count();
    fs::write(&path, &content[..content.len() - 4]).unwrap();

    let result = load_session_from_file(&path);
    assert!(
        matches!(result, Err(ReplayError::IncompleteLine { line }) if line == line_count),
        "got {result:?}"
    );
}

/// The live log is readable at any point of a game, not only after close.
#[test]
fn live_log_is_complete_after_every_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = ReplayController::new(ReplayConfig::with_user_dir(dir.path()));
    let (mut world, units) = world(3);
    for cycle in 0..5 {
        world.step_to(cycle);
        issue(&mut controller, &mut world, CommandArgs::new(Action::Stop).unit(&units[0]));
        let on_disk = load_session_from_file(controller.last_log_path().unwrap()).unwrap();
        assert_eq!(Some(&on_disk), controller.session());
    }
    assert_eq!(world.current_cycle(), 4);
}
