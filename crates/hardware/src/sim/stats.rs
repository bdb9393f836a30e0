//! Execution statistics.
//!
//! Counters are cheap enough to keep unconditionally; only the cycle
//! estimate is gated on the configuration.

use std::collections::BTreeMap;

use tracing::info;

use crate::isa::OpClass;

/// Retirement and timing counters for one run.
#[derive(Clone, Debug, Default)]
pub struct SimStats {
    /// Instructions retired.
    pub instructions: u64,
    /// Estimated cycles (zero when the cycle sub-model is disabled).
    pub cycles: u64,
    /// Memory-to-memory pipeline stalls.
    pub memory_stalls: u64,
    /// Returns that hit the fast link-register path.
    pub fast_returns: u64,
    classes: BTreeMap<&'static str, u64>,
}

impl SimStats {
    pub(crate) fn record(&mut self, class: OpClass) {
        self.instructions += 1;
        *self.classes.entry(class.name()).or_insert(0) += 1;
    }

    /// Retirement counts per instruction class.
    pub fn class_counts(&self) -> &BTreeMap<&'static str, u64> {
        &self.classes
    }

    /// Logs a run summary.
    pub fn report(&self, decode_misses: u64) {
        info!(
            instructions = self.instructions,
            cycles = self.cycles,
            decode_misses,
            memory_stalls = self.memory_stalls,
            fast_returns = self.fast_returns,
            "run complete"
        );
        for (class, count) in &self.classes {
            info!(class, count, "retired");
        }
    }
}
