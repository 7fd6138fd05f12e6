//! 🏗 Shared infrastructure: fetch tasks, race outcomes, cancellation,
//! request handling and settings.
#![warn(missing_docs)]

mod cancel;
#[cfg(feature = "logging")]
mod logging;
mod request;
mod settings;
mod task;

pub use cancel::{CancelGuard, CancelSignal};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use request::{RawRequest, Request, RequestHandler, RequestKind};
pub use settings::{
    ClientSettings, RaceSettings, ServerSettings, Settings, SettingsError, SETTINGS_FILE,
};
pub use task::{
    FetchError, FetchTask, LocalFetchTask, Payload, RaceOutcome, Strictness, TaskId, TaskReport,
};
