pub mod backend;
pub mod error;
pub mod event;
pub mod record;
pub mod script;
pub mod stimulus;

pub use backend::{AssetRequest, Input, KeySource, Presenter, StimulusLoader};
pub use error::{LoadError, ParseKindError, PresentError};
pub use event::{AtomicEvent, EventPayload, StimulusRef};
pub use record::{LogRecord, KEYPRESS_CONDITION};
pub use script::{InstructionKind, InstructionRow, ScriptRow};
pub use stimulus::{AssetKind, EventType, StimulusType};
