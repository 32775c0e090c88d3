pub mod control_loop;
pub mod environment;
pub mod session_log;

pub use control_loop::{run_cycle, run_replay, ReplaySummary};
pub use environment::{DwellOutcome, EnvironmentController, ReplayEnvironment};
pub use session_log::{SessionLog, SessionRecord, SESSION_LOG_FILE};
