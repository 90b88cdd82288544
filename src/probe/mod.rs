//! Host capability probe
//!
//! Reports how many parallel execution units the host offers. The system
//! reading is computed once on first access and cached for the program
//! lifetime, so every decision in one process sees the same value.

use std::sync::LazyLock;

/// Cached host parallelism - computed once, never zero
static HOST_PARALLELISM: LazyLock<usize> = LazyLock::new(|| {
    let detected = num_cpus::get();
    if detected == 0 {
        tracing::warn!("Could not determine CPU count, assuming a single core");
    }
    tracing::debug!("Detected {} usable CPU cores", detected);
    detected.max(1)
});

/// Source of the host's usable parallelism
pub trait CapabilityProbe: Send + Sync {
    /// Number of usable parallel execution units, always at least 1
    fn available_parallelism(&self) -> usize;
}

/// Probe backed by the operating system's CPU count
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl CapabilityProbe for SystemProbe {
    fn available_parallelism(&self) -> usize {
        *HOST_PARALLELISM
    }
}

/// Probe returning a fixed reading, for pinning decisions in tests and dry runs
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(usize);

impl FixedProbe {
    pub fn new(cores: usize) -> Self {
        Self(cores.max(1))
    }
}

impl CapabilityProbe for FixedProbe {
    fn available_parallelism(&self) -> usize {
        self.0
    }
}
