pub mod backup;
pub mod catalog;
pub mod distance;
pub mod expansion;
pub mod extraction;
pub mod graph;
pub mod removal;
pub mod repair;
pub mod taxonomy;
pub mod test_harness;
pub mod types;

pub mod api;
pub mod error;
pub mod handle;

pub use api::*;
pub use error::*;
pub use handle::*;
pub use types::*;

/// Re-export test harness for external use
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};
