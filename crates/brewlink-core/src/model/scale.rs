// ── Scale domain types ──

use serde::{Deserialize, Serialize};

/// Point-in-time scale reading delivered over the snapshot channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleSnapshot {
    /// Weight in grams.
    pub weight_grams: f64,
    /// Weight flow in grams per second, if the scale computes one.
    pub flow_grams_per_sec: Option<f64>,
    /// Battery charge, 0-100.
    pub battery_percent: Option<f64>,
    /// Gateway-side millisecond timestamp of the sample.
    pub timestamp: Option<u64>,
}
