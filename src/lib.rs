pub mod config;
pub mod error;
pub mod grid;
pub mod logging;
pub mod output;
pub mod process;
pub mod report;
pub mod stats;

pub use config::RunParams;
pub use error::{BurstError, Result};
pub use process::{process_file, process_grid, Deployment};
