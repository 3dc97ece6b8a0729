pub mod config;
pub mod region;
pub mod status;
pub mod types;

pub use config::ChaosConfig;
pub use region::{RegionError, RegionLayout, brokers_outside_region};
pub use status::{ChangeStatus, classify};
pub use types::*;
