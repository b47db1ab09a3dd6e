//! Inter-context communication
//!
//! This module defines the pipeline context: the queues and flag sets that
//! carry samples from the conversion interrupt to the coordinator and values
//! from the coordinator to the reporter. The context is built once at
//! startup and every task (and the interrupt handler registration) receives
//! a `&'static Pipeline`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel as Queue;
use portable_atomic::{AtomicU32, Ordering};

use crate::config::{OUTPUT_QUEUE_LEN, SAMPLE_QUEUE_LEN};
use crate::flags::EventFlags;
use crate::types::Sample;

/// Samples from the conversion interrupt to the coordinator
/// Buffer size: 16 (four full sweeps)
pub type SampleQueue = Queue<CriticalSectionRawMutex, Sample, SAMPLE_QUEUE_LEN>;

/// Selected-channel values from the coordinator to the reporter
/// Buffer size: 10
pub type OutputQueue = Queue<CriticalSectionRawMutex, u16, OUTPUT_QUEUE_LEN>;

/// Counters for conditions that are handled locally but worth reporting
pub struct Diagnostics {
    dropped: AtomicU32,
    spurious: AtomicU32,
    coalesced_ready: AtomicU32,
}

/// Point-in-time copy of [`Diagnostics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticsSnapshot {
    /// Samples dropped because the sample queue was full
    pub dropped: u32,
    /// Completion signals from unknown sources
    pub spurious: u32,
    /// Ready bits raised again before the coordinator cleared them
    pub coalesced_ready: u32,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            dropped: AtomicU32::new(0),
            spurious: AtomicU32::new(0),
            coalesced_ready: AtomicU32::new(0),
        }
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spurious(&self) {
        self.spurious.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced_ready(&self) {
        self.coalesced_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            dropped: self.dropped.load(Ordering::Relaxed),
            spurious: self.spurious.load(Ordering::Relaxed),
            coalesced_ready: self.coalesced_ready.load(Ordering::Relaxed),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything shared between the conversion interrupt and the tasks
pub struct Pipeline {
    /// Written from interrupt context with `try_send` only
    pub samples: SampleQueue,
    /// One bit per channel, raised after a successful enqueue
    pub channel_ready: EventFlags,
    /// One bit per selection button
    pub selection: EventFlags,
    pub output: OutputQueue,
    pub diagnostics: Diagnostics,
}

impl Pipeline {
    pub const fn new() -> Self {
        Self {
            samples: SampleQueue::new(),
            channel_ready: EventFlags::new(),
            selection: EventFlags::new(),
            output: OutputQueue::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
