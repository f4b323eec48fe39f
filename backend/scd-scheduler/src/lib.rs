pub mod api;
pub mod arbiter;
pub mod audio;
pub mod dma;
pub mod hardware;
pub mod interrupts;
pub mod led;
mod scheduler;
pub mod signals;
mod snapshot;
pub mod strategy;
pub mod timing;
pub mod trace;
pub mod vdp;

pub use api::FrameDriver;
pub use scd_scheduler_config::{ConfigError, Interleaving, SchedulerConfig, TimingMode};
pub use scheduler::{CycleBudgets, FrameReport, FrameScheduler, FrameVariant, LineKind};
pub use snapshot::{SchedulerSnapshot, SnapshotError};
