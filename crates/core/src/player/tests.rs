use super::*;
use crate::command::SimCommand;
use crate::entry::Action;
use crate::host::GameState;
use crate::sandbox::{SandboxUnit, SandboxWorld};
use crate::types::{Pos, UnitSlot};

const WORLD_SEED: u64 = 0x00c0_ffee;

fn fixture_world() -> SandboxWorld {
    let mut world = SandboxWorld::new(WORLD_SEED);
    world.spawn("unit-footman");
    world.spawn("unit-archer");
    world
}

fn unit_entry(cycle: u64, action: Action, slot: u32) -> LogEntry {
    let mut entry = LogEntry::new(cycle, action, 0);
    entry.unit = Some(UnitSlot(slot));
    entry
}

/// Play `plan` on a fresh fixture world the way live recording would,
/// stamping each entry with the seed seen when it was issued.
fn recorded(plan: Vec<LogEntry>) -> ReplaySession {
    let mut world = fixture_world();
    let mut session = ReplaySession::from_live(world.snapshot(), String::new());
    for mut entry in plan {
        world.step_to(entry.cycle);
        entry.sync_seed = world.sync_seed();
        if let Ok(Dispatch::Send(command)) = command::resolve(&entry, &world) {
            world.send(command);
        }
        session.push(entry);
    }
    session
}

fn step_at(
    player: &mut Player,
    session: &ReplaySession,
    world: &mut SandboxWorld,
    cycle: u64,
) -> StepOutcome {
    world.step_to(cycle);
    player.advance(session, world)
}

fn sent_actions(world: &SandboxWorld) -> Vec<&'static str> {
    world
        .sent()
        .iter()
        .map(|(_, command)| match command {
            SimCommand::Move { .. } => "move",
            SimCommand::Attack { .. } => "attack",
            SimCommand::Stop { .. } => "stop",
            SimCommand::Train { .. } => "train",
            _ => "other",
        })
        .collect()
}

fn loaded_player(sync_check: SyncCheckMode) -> Player {
    let mut player = Player::new(sync_check);
    player.load();
    player
}

#[test]
fn idle_player_does_nothing() {
    let mut player = Player::new(SyncCheckMode::Strict);
    let mut world = fixture_world();
    let session = recorded(vec![unit_entry(0, Action::Stop, 0)]);
    assert_eq!(player.advance(&session, &mut world), StepOutcome::Inactive);
    assert!(world.sent().is_empty());
}

#[test]
fn same_cycle_burst_then_gap_then_end() {
    let mut attack = unit_entry(10, Action::Attack, 1);
    attack.pos = Some(Pos::new(5, 5));
    attack.dest = Some(UnitSlot(0));
    let mut moved = unit_entry(10, Action::Move, 0);
    moved.pos = Some(Pos::new(3, 4));
    let session = recorded(vec![moved, attack, unit_entry(12, Action::Stop, 0)]);

    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);

    for cycle in 0..10 {
        assert_eq!(
            step_at(&mut player, &session, &mut world, cycle),
            StepOutcome::Waiting { next_cycle: 10 }
        );
    }
    assert_eq!(player.cursor(), Some(0));

    assert_eq!(
        step_at(&mut player, &session, &mut world, 10),
        StepOutcome::Dispatched { count: 2 }
    );
    assert_eq!(sent_actions(&world), vec!["move", "attack"]);
    assert_eq!(player.cursor(), Some(2));

    assert_eq!(
        step_at(&mut player, &session, &mut world, 11),
        StepOutcome::Waiting { next_cycle: 12 }
    );
    assert_eq!(world.sent().len(), 2);

    assert_eq!(
        step_at(&mut player, &session, &mut world, 12),
        StepOutcome::Finished { dispatched: 1 }
    );
    assert_eq!(sent_actions(&world), vec!["move", "attack", "stop"]);
    assert_eq!(player.state(), PlaybackState::Exhausted);
    assert_eq!(player.cursor(), None);
    assert_eq!(world.notifications(), [END_OF_REPLAY.to_string()]);
    assert_eq!(player.desync_count(), 0);

    assert_eq!(step_at(&mut player, &session, &mut world, 13), StepOutcome::Exhausted);
    assert_eq!(world.notifications().len(), 1);
}

#[test]
fn waiting_twice_on_one_cycle_changes_nothing() {
    let session = recorded(vec![unit_entry(0, Action::Stop, 0), unit_entry(8, Action::Stop, 1)]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);
    assert_eq!(player.advance(&session, &mut world), StepOutcome::Dispatched { count: 1 });

    world.step_to(5);
    let first = player.advance(&session, &mut world);
    let cursor = player.cursor();
    let second = player.advance(&session, &mut world);
    assert_eq!(first, StepOutcome::Waiting { next_cycle: 8 });
    assert_eq!(second, first);
    assert_eq!(player.cursor(), cursor);
    assert_eq!(world.sent().len(), 1);
}

#[test]
fn empty_session_finishes_on_first_step() {
    let session = recorded(Vec::new());
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);
    assert_eq!(player.advance(&session, &mut world), StepOutcome::Finished { dispatched: 0 });
    assert_eq!(player.state(), PlaybackState::Exhausted);
    assert_eq!(world.notifications(), [END_OF_REPLAY.to_string()]);
    assert!(world.sent().is_empty());
}

#[test]
fn strict_mismatch_stops_before_the_diverged_entry() {
    let session = recorded(vec![
        unit_entry(10, Action::Stop, 0),
        unit_entry(11, Action::Stop, 1),
        unit_entry(12, Action::Stop, 0),
    ]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);

    assert_eq!(
        step_at(&mut player, &session, &mut world, 10),
        StepOutcome::Dispatched { count: 1 }
    );
    world.step_to(11);
    world.perturb();
    assert_eq!(
        player.advance(&session, &mut world),
        StepOutcome::Desynced { cycle: 11, dispatched: 0 }
    );
    assert_eq!(player.state(), PlaybackState::Exhausted);
    assert_eq!(world.notifications(), [OUT_OF_SYNC.to_string()]);

    assert_eq!(step_at(&mut player, &session, &mut world, 12), StepOutcome::Exhausted);
    assert_eq!(world.sent().len(), 1);
    assert_eq!(world.notifications().len(), 1);
    assert_eq!(player.desync_count(), 1);
}

#[test]
fn diagnostic_mismatch_reports_and_keeps_going() {
    let session = recorded(vec![
        unit_entry(10, Action::Stop, 0),
        unit_entry(11, Action::Stop, 1),
        unit_entry(12, Action::Stop, 0),
    ]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Diagnostic);

    step_at(&mut player, &session, &mut world, 10);
    world.step_to(11);
    world.perturb();
    assert_eq!(player.advance(&session, &mut world), StepOutcome::Dispatched { count: 1 });
    assert_eq!(
        step_at(&mut player, &session, &mut world, 12),
        StepOutcome::Finished { dispatched: 1 }
    );

    assert_eq!(world.sent().len(), 3);
    // The divergence carries forward, so cycle 12 mismatches too.
    assert_eq!(player.desync_count(), 2);
    assert_eq!(
        world.notifications(),
        [
            "Replay got out of sync (11) !".to_string(),
            "Replay got out of sync (12) !".to_string(),
            END_OF_REPLAY.to_string(),
        ]
    );
}

#[test]
fn zero_seed_in_diagnostic_mode_reports_missing_sync_info() {
    let mut session = ReplaySession::from_live(fixture_world().snapshot(), String::new());
    session.push(unit_entry(0, Action::Stop, 0));
    let mut world = fixture_world();
    assert_ne!(world.sync_seed(), 0);
    let mut player = loaded_player(SyncCheckMode::Diagnostic);

    assert_eq!(player.advance(&session, &mut world), StepOutcome::Finished { dispatched: 1 });
    assert_eq!(world.notifications(), [NO_SYNC_INFO.to_string(), END_OF_REPLAY.to_string()]);
}

#[test]
fn recorded_names_are_applied_once_on_first_step() {
    let mut session = recorded(vec![unit_entry(3, Action::Stop, 0)]);
    session.header.player_names[3] = "Zed".to_string();
    let mut world = fixture_world();
    world.live_mut().player_names[0] = "Host".to_string();
    let mut player = loaded_player(SyncCheckMode::Strict);

    player.advance(&session, &mut world);
    let names = world.snapshot().player_names;
    assert_eq!(names[3], "Zed");
    assert_eq!(names[0], "Host");

    world.live_mut().player_names[3] = "Renamed".to_string();
    step_at(&mut player, &session, &mut world, 1);
    assert_eq!(world.snapshot().player_names[3], "Renamed");
}

#[test]
fn chat_is_shown_and_sounded_not_simulated() {
    let mut chat = LogEntry::new(2, Action::Chat, 0);
    chat.value = Some("gg".to_string());
    let session = recorded(vec![chat]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);

    step_at(&mut player, &session, &mut world, 2);
    assert!(world.sent().is_empty());
    assert_eq!(world.chat_sounds(), 1);
    assert_eq!(world.notifications()[0], "gg");
}

#[test]
fn invalid_entries_are_skipped_without_stopping_playback() {
    let mut train = unit_entry(4, Action::Train, 0);
    train.value = Some("unit-knight".to_string());
    let session = recorded(vec![
        unit_entry(4, Action::Unknown("teleport".to_string()), 0),
        unit_entry(4, Action::Stop, 99),
        LogEntry::new(4, Action::Move, 0),
        train,
    ]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);

    assert_eq!(
        step_at(&mut player, &session, &mut world, 4),
        StepOutcome::Finished { dispatched: 4 }
    );
    assert_eq!(sent_actions(&world), vec!["train"]);
    let (cycle, SimCommand::Train { unit, unit_type, .. }) = &world.sent()[0] else {
        panic!("expected train");
    };
    assert_eq!(*cycle, 4);
    assert_eq!(unit, &SandboxUnit { slot: UnitSlot(0), type_ident: "unit-footman".to_string() });
    assert_eq!(unit_type, "unit-knight");
}

#[test]
fn unit_type_mismatch_still_dispatches() {
    let mut entry = unit_entry(1, Action::Stop, 1);
    entry.unit_ident = "unit-footman".to_string();
    let session = recorded(vec![entry]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);

    step_at(&mut player, &session, &mut world, 1);
    assert_eq!(sent_actions(&world), vec!["stop"]);
}

#[test]
fn reset_returns_to_idle() {
    let session = recorded(vec![unit_entry(5, Action::Stop, 0)]);
    let mut world = fixture_world();
    let mut player = loaded_player(SyncCheckMode::Strict);
    player.advance(&session, &mut world);
    assert_eq!(player.cursor(), Some(0));

    player.reset();
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(player.advance(&session, &mut world), StepOutcome::Inactive);
}
