//! CPU affinity and thread priority for the engine worker
//!
//! Pinning the event loop to an isolated core and running it SCHED_FIFO
//! removes most scheduler-induced latency jitter.

use anyhow::Result;
use core_affinity::CoreId;
use serde::{Deserialize, Serialize};

/// Placement of the engine worker thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAffinity {
    /// Core to pin to
    #[serde(default)]
    pub cpu_core: Option<usize>,
    /// SCHED_FIFO priority (Linux only, needs CAP_SYS_NICE)
    #[serde(default)]
    pub realtime_priority: Option<i32>,
}

impl WorkerAffinity {
    pub fn is_noop(&self) -> bool {
        self.cpu_core.is_none() && self.realtime_priority.is_none()
    }

    /// Apply to the calling thread
    pub fn apply(&self) -> Result<()> {
        if let Some(core) = self.cpu_core {
            pin_to_core(core)?;
        }
        if let Some(priority) = self.realtime_priority {
            set_realtime_priority(priority)?;
        }
        Ok(())
    }
}

/// Pin the current thread to a specific CPU core
pub fn pin_to_core(core: usize) -> Result<()> {
    let available = num_cores();
    if core >= available {
        anyhow::bail!("CPU core {} out of range ({} cores available)", core, available);
    }

    if core_affinity::set_for_current(CoreId { id: core }) {
        Ok(())
    } else {
        anyhow::bail!("Failed to pin thread to core {}", core)
    }
}

/// Set SCHED_FIFO priority for the current thread
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    let param = sched_param {
        sched_priority: priority,
    };

    // SAFETY: pid 0 targets the calling thread; `param` outlives the call
    let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc == 0 {
        Ok(())
    } else {
        anyhow::bail!("Failed to set thread priority (may need CAP_SYS_NICE or root)")
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    anyhow::bail!("Real-time priority is only supported on Linux")
}

/// Number of cores visible to this process
pub fn num_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
}
