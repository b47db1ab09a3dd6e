//! Conversion acquisition
//!
//! The interrupt side of the pipeline: the per-channel conversion-complete
//! handler, the cursor that attributes completions to channels within a
//! sweep, and the periodic timer that starts each sweep.
//!
//! Nothing in this module blocks or allocates on the interrupt path. A full
//! sample queue drops the sample and counts it; the ready flag is raised
//! only after a successful enqueue, so a drop never wakes the coordinator
//! with nothing to drain.

use embassy_time::{Duration, Ticker};
use portable_atomic::{AtomicU8, Ordering};

use crate::channels::Pipeline;
use crate::config::CHANNEL_COUNT;
use crate::types::{AcquireError, Channel, Sample};

/// Hardware action that starts one conversion sweep over all four channels.
/// Starting while a sweep is in progress restarts it from channel 0.
pub trait ConversionTrigger {
    fn start_sweep(&mut self);
}

/// Conversion-complete handler, registered with the interrupt that signals a finished channel
pub struct ConversionHandler<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> ConversionHandler<'a> {
    pub const fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Handle one completed conversion from interrupt context.
    ///
    /// `source` is the converter's channel index and `raw` its 12-bit result.
    /// The queue and flag wakers pend the executor, so a coordinator blocked on
    /// either runs as soon as the interrupt returns.
    pub fn on_conversion_complete(&self, source: u8, raw: u16) -> Result<Sample, AcquireError> {
        let Some(channel) = Channel::from_index(source) else {
            self.pipeline.diagnostics.record_spurious();
            return Err(AcquireError::SpuriousSource(source));
        };

        let sample = Sample::from_raw(channel, raw);
        if self.pipeline.samples.try_send(sample).is_err() {
            self.pipeline.diagnostics.record_dropped();
            return Err(AcquireError::QueueFull(sample));
        }

        let previous = self.pipeline.channel_ready.set(channel.mask());
        if previous & channel.mask() != 0 {
            self.pipeline.diagnostics.record_coalesced_ready();
        }

        Ok(sample)
    }
}

/// Attributes conversion completions to channels within one sweep.
///
/// The converter walks channels 0..=3 in order; the cursor holds the index
/// of the next completion. Outside a sweep it rests at `CHANNEL_COUNT`, which
/// the handler rejects as a spurious source.
pub struct SweepCursor {
    next: AtomicU8,
}

impl SweepCursor {
    const IDLE: u8 = CHANNEL_COUNT as u8;

    pub const fn new() -> Self {
        Self {
            next: AtomicU8::new(Self::IDLE),
        }
    }

    /// Start a new sweep at channel 0, abandoning any sweep in progress
    pub fn restart(&self) {
        self.next.store(0, Ordering::Release);
    }

    /// Source index of the conversion that just finished, and whether another
    /// conversion must be started to complete the sweep
    pub fn complete(&self) -> (u8, bool) {
        let source = self.next.load(Ordering::Acquire);
        if source < Self::IDLE {
            self.next.store(source + 1, Ordering::Release);
        }
        (source, source + 1 < Self::IDLE)
    }

    pub fn in_progress(&self) -> bool {
        self.next.load(Ordering::Acquire) < Self::IDLE
    }
}

impl Default for SweepCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a sweep immediately, then once every `period`
pub async fn run_acquisition_timer<T: ConversionTrigger>(mut trigger: T, period: Duration) {
    info!("Acquisition timer started ({} ms period)", period.as_millis());

    let mut ticker = Ticker::every(period);
    loop {
        trigger.start_sweep();
        ticker.next().await;
    }
}
