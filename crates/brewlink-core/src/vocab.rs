//! Wire ↔ domain vocabulary for machine states.
//!
//! The gateway's state strings accumulated synonyms across firmware
//! generations (`"sleep"` vs `"sleeping"`), so the forward mapping is
//! many-to-one and total: every wire string lands on a domain state,
//! unknown strings on the documented default. The reverse mapping is the
//! command vocabulary and is stable per domain state.
//!
//! Both directions are static match tables -- identical input always
//! yields identical output.

use serde::{Deserialize, Serialize};

/// Normalized machine operating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MachineState {
    Sleeping,
    Idle,
    Espresso,
    Steam,
    HotWater,
    Flush,
    Descale,
    Clean,
    NeedsWater,
    Booting,
}

/// Default domain state for wire strings with no explicit entry.
pub const DEFAULT_STATE: MachineState = MachineState::Idle;

impl MachineState {
    /// Wire → domain. Total: unknown strings fall back to
    /// [`DEFAULT_STATE`], never an error.
    pub fn from_wire(wire: &str) -> Self {
        match wire {
            "sleep" | "sleeping" => Self::Sleeping,
            "idle" => Self::Idle,
            "espresso" => Self::Espresso,
            "steam" => Self::Steam,
            "hotWater" | "hotwater" | "water" => Self::HotWater,
            "flush" | "hotWaterRinse" => Self::Flush,
            "descale" => Self::Descale,
            "clean" | "cleaning" => Self::Clean,
            "needsWater" | "refill" => Self::NeedsWater,
            "booting" | "init" => Self::Booting,
            unknown => {
                tracing::debug!(state = unknown, "unknown wire state, using default");
                DEFAULT_STATE
            }
        }
    }

    /// Domain → wire. Explicit entries cover the states the gateway
    /// accepts as transition commands; anything else passes through as
    /// its literal lowerCamel name and may be rejected by the gateway.
    pub fn to_wire(self) -> &'static str {
        match self {
            Self::Sleeping => "sleep",
            Self::Idle => "idle",
            Self::Espresso => "espresso",
            Self::Steam => "steam",
            Self::HotWater => "hotWater",
            Self::Flush => "flush",
            state => state.literal_name(),
        }
    }

    /// The lowerCamel literal name of this variant, used as the reverse
    /// fallback for states without an explicit wire entry.
    fn literal_name(self) -> &'static str {
        match self {
            Self::Sleeping => "sleeping",
            Self::Idle => "idle",
            Self::Espresso => "espresso",
            Self::Steam => "steam",
            Self::HotWater => "hotWater",
            Self::Flush => "flush",
            Self::Descale => "descale",
            Self::Clean => "clean",
            Self::NeedsWater => "needsWater",
            Self::Booting => "booting",
        }
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.literal_name())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_mapping_collapses_synonyms() {
        assert_eq!(MachineState::from_wire("sleep"), MachineState::Sleeping);
        assert_eq!(MachineState::from_wire("sleeping"), MachineState::Sleeping);
        assert_eq!(MachineState::from_wire("hotWater"), MachineState::HotWater);
        assert_eq!(MachineState::from_wire("water"), MachineState::HotWater);
    }

    #[test]
    fn forward_mapping_is_total() {
        assert_eq!(MachineState::from_wire("unknown_value"), MachineState::Idle);
        assert_eq!(MachineState::from_wire(""), MachineState::Idle);
    }

    #[test]
    fn reverse_mapping_is_stateless() {
        // Prior lookups must not influence the reverse table.
        let _ = MachineState::from_wire("sleeping");
        assert_eq!(MachineState::Sleeping.to_wire(), "sleep");
        let _ = MachineState::from_wire("garbage");
        assert_eq!(MachineState::Sleeping.to_wire(), "sleep");
    }

    #[test]
    fn reverse_fallback_uses_literal_name() {
        // No explicit command entry for these -- literal pass-through.
        assert_eq!(MachineState::Descale.to_wire(), "descale");
        assert_eq!(MachineState::NeedsWater.to_wire(), "needsWater");
    }

    #[test]
    fn round_trip_is_not_required_to_be_identity() {
        // "sleeping" → Sleeping → "sleep": forward synonyms collapse.
        let state = MachineState::from_wire("sleeping");
        assert_eq!(state.to_wire(), "sleep");
    }
}
