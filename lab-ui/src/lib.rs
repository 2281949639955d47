pub mod app;
pub mod config;
pub mod csv_loader;
pub mod input;
pub mod logging;
pub mod presentation;
pub mod state;
pub mod workspace;

pub use presentation::ResultView;
pub use state::{GateError, WorkspaceState};
pub use workspace::{PendingCalculation, Workspace, WorkspaceError};
