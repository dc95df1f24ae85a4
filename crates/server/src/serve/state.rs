//! Application state shared across request handlers.

use mcr_engine::ReportEngine;

pub(crate) struct AppState {
    /// The report engine over the process's stores.
    pub(crate) engine: ReportEngine,
}
