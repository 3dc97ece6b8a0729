//! Region assignment for multi-region failover drills.
//!
//! Brokers are spread round-robin over regions: broker `n` lives in region
//! `n mod regions`.

use thiserror::Error;

use crate::types::{BrokerId, Topology};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("region count must be at least 1")]
    NoRegions,

    #[error("region id {target} is out of range for {regions} regions")]
    TargetOutOfRange { regions: u32, target: u32 },
}

/// Number of regions and the region to fail over to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    regions: u32,
    target: u32,
}

impl RegionLayout {
    pub fn new(regions: u32, target: u32) -> Result<Self, RegionError> {
        if regions == 0 {
            return Err(RegionError::NoRegions);
        }
        if target >= regions {
            return Err(RegionError::TargetOutOfRange { regions, target });
        }
        Ok(Self { regions, target })
    }

    pub fn regions(&self) -> u32 {
        self.regions
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn region_of(&self, broker: BrokerId) -> u32 {
        i64::from(broker).rem_euclid(i64::from(self.regions)) as u32
    }
}

/// Brokers that do not belong to the target region, in snapshot order.
///
/// These are the brokers to force-remove when failing over *to* the
/// target region.
pub fn brokers_outside_region(topology: &Topology, layout: RegionLayout) -> Vec<BrokerId> {
    topology
        .brokers
        .iter()
        .map(|b| b.id)
        .filter(|&id| layout.region_of(id) != layout.target())
        .collect()
}
