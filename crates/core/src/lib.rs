pub mod config;
pub mod error;
pub mod ids;

pub use config::{Config, SchedulerConfig};
pub use error::*;
pub use ids::*;
