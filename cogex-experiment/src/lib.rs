pub mod config;
pub mod dispatch;
pub mod error;
pub mod instructions;
pub mod log;
pub mod queue;
pub mod script;
pub mod session;
pub mod timeline;

pub use config::{DispatchConfig, SessionConfig, TimingConfig};
pub use dispatch::{DispatchOutcome, Dispatcher, Flow};
pub use error::{ScriptError, SessionError, SessionResult, SetupError, SetupResult};
pub use instructions::{Instructions, is_instruction_script, media_dir};
pub use log::SessionLog;
pub use queue::EventQueue;
pub use script::{parse_event_script, parse_instruction_script, read_event_script, read_instruction_script};
pub use session::Session;
pub use timeline::TimelineCompiler;
