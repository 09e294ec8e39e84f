//! Dispatch table from recorded entries to simulation commands.
//!
//! Each action family maps to one [`SimCommand`] shape. Units are resolved
//! through the host's [`UnitRegistry`] at dispatch time; the `-1` sentinel
//! never reaches the registry.

use thiserror::Error;
use tracing::warn;

use crate::entry::{Action, LogEntry};
use crate::host::UnitRegistry;
use crate::types::{DiplomacyState, Pos, UnitSlot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimCommand<U> {
    Stop { unit: U },
    StandGround { unit: U, flush: i32 },
    Defend { unit: U, target: U, flush: i32 },
    Follow { unit: U, target: U, flush: i32 },
    Move { unit: U, pos: Pos, flush: i32 },
    Repair { unit: U, pos: Pos, target: Option<U>, flush: i32 },
    AutoRepair { unit: U, enabled: i32 },
    Attack { unit: U, pos: Pos, target: Option<U>, flush: i32 },
    AttackGround { unit: U, pos: Pos, flush: i32 },
    Patrol { unit: U, pos: Pos, flush: i32 },
    Board { unit: U, target: U, flush: i32 },
    Unload { unit: U, pos: Pos, target: Option<U>, flush: i32 },
    Build { unit: U, pos: Pos, unit_type: String, flush: i32 },
    Explore { unit: U, flush: i32 },
    Dismiss { unit: U },
    ResourceLoc { unit: U, pos: Pos, flush: i32 },
    Resource { unit: U, target: U, flush: i32 },
    ReturnGoods { unit: U, target: Option<U>, flush: i32 },
    Train { unit: U, unit_type: String, flush: i32 },
    CancelTrain { unit: U, slot: i32, unit_type: Option<String> },
    UpgradeTo { unit: U, unit_type: String, flush: i32 },
    CancelUpgradeTo { unit: U },
    Research { unit: U, upgrade: String, flush: i32 },
    CancelResearch { unit: U },
    SpellCast { unit: U, pos: Pos, target: Option<U>, spell: i32, flush: i32 },
    AutoSpellCast { unit: U, spell: i32, enabled: i32 },
    /// `state` is `None` when the recorded value named no known state;
    /// the command is still forwarded so the simulation sees the same
    /// request the live game issued.
    Diplomacy { player: i32, state: Option<DiplomacyState>, other: i32 },
    SharedVision { player: i32, enabled: bool, other: i32 },
    /// Console line echoed from the recording, leading `-` stripped.
    ConsoleCommand { line: String },
    Cheat { text: String },
    Quit { player: i32 },
}

/// What playing one entry asks of the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch<U> {
    Send(SimCommand<U>),
    /// Chat is shown to the viewer and sounded, not simulated.
    Chat(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid action '{0}'")]
    UnknownAction(String),
    #[error("action '{action}' has no {role} unit")]
    MissingUnit { action: String, role: &'static str },
    #[error("action '{action}' refers to {role} unit {slot} which no longer exists")]
    UnresolvedUnit { action: String, role: &'static str, slot: UnitSlot },
    #[error("action '{action}' has no value argument")]
    MissingValue { action: String },
}

/// Map one entry to the host call it stands for.
pub fn resolve<R: UnitRegistry>(
    entry: &LogEntry,
    registry: &R,
) -> Result<Dispatch<R::Unit>, DispatchError> {
    let args = Args { entry, registry };
    let flush = entry.flush;
    let pos = entry.position();

    let command = match &entry.action {
        Action::Stop => SimCommand::Stop { unit: args.unit()? },
        Action::StandGround => SimCommand::StandGround { unit: args.unit()?, flush },
        Action::Defend => {
            SimCommand::Defend { unit: args.unit()?, target: args.target()?, flush }
        }
        Action::Follow => {
            SimCommand::Follow { unit: args.unit()?, target: args.target()?, flush }
        }
        Action::Move => SimCommand::Move { unit: args.unit()?, pos, flush },
        Action::Repair => {
            SimCommand::Repair { unit: args.unit()?, pos, target: args.optional_target()?, flush }
        }
        Action::AutoRepair => SimCommand::AutoRepair { unit: args.unit()?, enabled: pos.x },
        Action::Attack => {
            SimCommand::Attack { unit: args.unit()?, pos, target: args.optional_target()?, flush }
        }
        Action::AttackGround => SimCommand::AttackGround { unit: args.unit()?, pos, flush },
        Action::Patrol => SimCommand::Patrol { unit: args.unit()?, pos, flush },
        Action::Board => SimCommand::Board { unit: args.unit()?, target: args.target()?, flush },
        Action::Unload => {
            SimCommand::Unload { unit: args.unit()?, pos, target: args.optional_target()?, flush }
        }
        Action::Build => {
            SimCommand::Build { unit: args.unit()?, pos, unit_type: args.value()?, flush }
        }
        Action::Explore => SimCommand::Explore { unit: args.unit()?, flush },
        Action::Dismiss => SimCommand::Dismiss { unit: args.unit()? },
        Action::ResourceLoc => SimCommand::ResourceLoc { unit: args.unit()?, pos, flush },
        Action::Resource => {
            SimCommand::Resource { unit: args.unit()?, target: args.target()?, flush }
        }
        Action::Return => {
            SimCommand::ReturnGoods { unit: args.unit()?, target: args.optional_target()?, flush }
        }
        Action::Train => SimCommand::Train { unit: args.unit()?, unit_type: args.value()?, flush },
        Action::CancelTrain => SimCommand::CancelTrain {
            unit: args.unit()?,
            slot: entry.num_or_sentinel(),
            unit_type: entry.value.clone().filter(|value| !value.is_empty()),
        },
        Action::UpgradeTo => {
            SimCommand::UpgradeTo { unit: args.unit()?, unit_type: args.value()?, flush }
        }
        Action::CancelUpgradeTo => SimCommand::CancelUpgradeTo { unit: args.unit()? },
        Action::Research => {
            SimCommand::Research { unit: args.unit()?, upgrade: args.value()?, flush }
        }
        Action::CancelResearch => SimCommand::CancelResearch { unit: args.unit()? },
        Action::SpellCast => SimCommand::SpellCast {
            unit: args.unit()?,
            pos,
            target: args.optional_target()?,
            spell: entry.num_or_sentinel(),
            flush,
        },
        Action::AutoSpellCast => SimCommand::AutoSpellCast {
            unit: args.unit()?,
            spell: entry.num_or_sentinel(),
            enabled: pos.x,
        },
        Action::Diplomacy => {
            let state = DiplomacyState::from_name(entry.value_str());
            if state.is_none() {
                warn!(value = entry.value_str(), "invalid diplomacy command");
            }
            SimCommand::Diplomacy { player: pos.x, state, other: pos.y }
        }
        Action::SharedVision => SimCommand::SharedVision {
            player: pos.x,
            enabled: parse_flag(entry.value_str()),
            other: pos.y,
        },
        Action::Input => {
            let text = args.value()?;
            match text.strip_prefix('-') {
                Some(line) => SimCommand::ConsoleCommand { line: line.to_string() },
                None => SimCommand::Cheat { text },
            }
        }
        Action::Chat => return Ok(Dispatch::Chat(entry.value_str().to_string())),
        Action::Quit => SimCommand::Quit { player: pos.x },
        Action::Unknown(tag) => return Err(DispatchError::UnknownAction(tag.clone())),
    };
    Ok(Dispatch::Send(command))
}

/// Numeric boolean: any number other than zero is true, non-numbers are false.
fn parse_flag(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(|number| number != 0.0)
}

struct Args<'a, R> {
    entry: &'a LogEntry,
    registry: &'a R,
}

impl<R: UnitRegistry> Args<'_, R> {
    fn lookup(&self, slot: Option<UnitSlot>, role: &'static str) -> Result<R::Unit, DispatchError> {
        let action = || self.entry.action.tag().to_string();
        let slot = slot.ok_or_else(|| DispatchError::MissingUnit { action: action(), role })?;
        self.registry
            .resolve_unit(slot)
            .ok_or_else(|| DispatchError::UnresolvedUnit { action: action(), role, slot })
    }

    fn unit(&self) -> Result<R::Unit, DispatchError> {
        self.lookup(self.entry.unit, "acting")
    }

    fn target(&self) -> Result<R::Unit, DispatchError> {
        self.lookup(self.entry.dest, "target")
    }

    fn optional_target(&self) -> Result<Option<R::Unit>, DispatchError> {
        match self.entry.dest {
            None => Ok(None),
            Some(slot) => self.lookup(Some(slot), "target").map(Some),
        }
    }

    fn value(&self) -> Result<String, DispatchError> {
        match self.entry.value.as_deref() {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(DispatchError::MissingValue { action: self.entry.action.tag().to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Registry where every even slot is alive.
    struct EvenSlots;

    impl UnitRegistry for EvenSlots {
        type Unit = u32;

        fn resolve_unit(&self, slot: UnitSlot) -> Option<u32> {
            (slot.0 % 2 == 0).then_some(slot.0)
        }

        fn unit_slot(&self, unit: &u32) -> UnitSlot {
            UnitSlot(*unit)
        }

        fn unit_type_ident(&self, _unit: &u32) -> String {
            "unit-footman".to_string()
        }
    }

    fn entry(action: Action) -> LogEntry {
        LogEntry::new(1, action, 0)
    }

    #[test]
    fn move_forwards_position_and_flush() {
        let mut e = entry(Action::Move);
        e.unit = Some(UnitSlot(4));
        e.pos = Some(Pos::new(12, 7));
        e.flush = 1;
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::Move { unit: 4, pos: Pos::new(12, 7), flush: 1 }))
        );
    }

    #[test]
    fn attack_target_is_optional() {
        let mut e = entry(Action::Attack);
        e.unit = Some(UnitSlot(2));
        e.pos = Some(Pos::new(3, 3));
        let Ok(Dispatch::Send(SimCommand::Attack { target, .. })) = resolve(&e, &EvenSlots) else {
            panic!("expected attack");
        };
        assert_eq!(target, None);

        e.dest = Some(UnitSlot(8));
        let Ok(Dispatch::Send(SimCommand::Attack { target, .. })) = resolve(&e, &EvenSlots) else {
            panic!("expected attack");
        };
        assert_eq!(target, Some(8));
    }

    #[test]
    fn missing_and_dead_units_are_reported() {
        let e = entry(Action::Stop);
        assert_eq!(
            resolve(&e, &EvenSlots),
            Err(DispatchError::MissingUnit { action: "stop".to_string(), role: "acting" })
        );

        let mut e = entry(Action::Follow);
        e.unit = Some(UnitSlot(2));
        e.dest = Some(UnitSlot(3));
        assert_eq!(
            resolve(&e, &EvenSlots),
            Err(DispatchError::UnresolvedUnit {
                action: "follow".to_string(),
                role: "target",
                slot: UnitSlot(3)
            })
        );
    }

    #[test]
    fn unknown_action_is_an_error() {
        let e = entry(Action::Unknown("warp".to_string()));
        assert_eq!(resolve(&e, &EvenSlots), Err(DispatchError::UnknownAction("warp".to_string())));
    }

    #[test]
    fn invalid_diplomacy_value_is_still_forwarded() {
        let mut e = entry(Action::Diplomacy);
        e.pos = Some(Pos::new(1, 3));
        e.value = Some("friendly".to_string());
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::Diplomacy { player: 1, state: None, other: 3 }))
        );

        e.value = Some("allied".to_string());
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::Diplomacy {
                player: 1,
                state: Some(DiplomacyState::Allied),
                other: 3
            }))
        );
    }

    #[test]
    fn shared_vision_parses_numeric_boolean() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" 2 "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn input_splits_console_lines_from_cheats() {
        let mut e = entry(Action::Input);
        e.value = Some("-SetGameSpeed(30)".to_string());
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::ConsoleCommand { line: "SetGameSpeed(30)".to_string() }))
        );

        e.value = Some("there is no aliens level".to_string());
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::Cheat { text: "there is no aliens level".to_string() }))
        );
    }

    #[test]
    fn chat_is_not_a_simulation_command() {
        let mut e = entry(Action::Chat);
        e.value = Some("gl hf".to_string());
        assert_eq!(resolve(&e, &EvenSlots), Ok(Dispatch::Chat("gl hf".to_string())));
    }

    #[test]
    fn cancel_train_forwards_slot_and_optional_type() {
        let mut e = entry(Action::CancelTrain);
        e.unit = Some(UnitSlot(6));
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::CancelTrain { unit: 6, slot: -1, unit_type: None }))
        );
        e.num = Some(2);
        e.value = Some("unit-peasant".to_string());
        assert_eq!(
            resolve(&e, &EvenSlots),
            Ok(Dispatch::Send(SimCommand::CancelTrain {
                unit: 6,
                slot: 2,
                unit_type: Some("unit-peasant".to_string())
            }))
        );
    }

    #[test]
    fn train_requires_a_unit_type() {
        let mut e = entry(Action::Train);
        e.unit = Some(UnitSlot(0));
        assert_eq!(
            resolve(&e, &EvenSlots),
            Err(DispatchError::MissingValue { action: "train".to_string() })
        );
    }
}
