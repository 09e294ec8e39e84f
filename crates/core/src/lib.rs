pub mod command;
pub mod config;
pub mod controller;
pub mod entry;
pub mod error;
pub mod host;
pub mod log_file;
pub mod player;
pub mod recorder;
pub mod sandbox;
pub mod session;
pub mod settings;
pub mod types;

pub use command::{Dispatch, DispatchError, SimCommand};
pub use config::{ReplayConfig, SyncCheckMode};
pub use controller::ReplayController;
pub use entry::{Action, LogEntry};
pub use error::ReplayError;
pub use host::{GameState, Launcher, Simulation, UnitRegistry};
pub use log_file::{LogWriter, load_session_from_file, parse_session, write_session};
pub use player::{PlaybackState, Player, StepOutcome};
pub use recorder::{CommandArgs, Recorder};
pub use session::{Compatibility, LiveSnapshot, MapInfo, ReplaySession, SessionHeader};
pub use settings::{NetGameType, PlayerPreset, PlayerType, Settings};
pub use types::*;
