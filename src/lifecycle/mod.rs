//! Process lifecycle: coordinated shutdown and periodic maintenance.

pub mod maintenance;
pub mod shutdown;

pub use maintenance::MaintenanceTask;
pub use shutdown::Shutdown;
