//! Coordinator task
//!
//! Drains samples flagged by the conversion interrupt into the last-value
//! table, applies at most one pending channel selection per cycle and
//! forwards the active channel's last value to the reporter.
//!
//! All blocking happens here, in task context: the interrupt side only ever
//! enqueues and raises flags.

use embassy_time::Duration;
use heapless::Vec;

use crate::channels::Pipeline;
use crate::config::{CHANNEL_COUNT, SAMPLE_QUEUE_LEN, SELECTION_TIMEOUT_MS};
use crate::flags::ALL_BITS;
use crate::types::{Channel, ChannelSelector, Sample};

/// Most samples one cycle can drain: one per ready bit plus a full backlog
pub const DRAIN_CAPACITY: usize = CHANNEL_COUNT + SAMPLE_QUEUE_LEN;

/// Phase of the coordinator's perpetual cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinatorState {
    WaitingForSamples,
    DrainingSamples,
    CheckingSelection,
    Forwarding,
}

/// What one coordinator cycle did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Samples drained this cycle, in drain order
    pub drained: Vec<Sample, DRAIN_CAPACITY>,
    /// Selection consumed this cycle, if any (may equal the previous one)
    pub selected: Option<ChannelSelector>,
    /// Value pushed to the output queue
    pub forwarded: u16,
}

pub struct Coordinator<'a> {
    pipeline: &'a Pipeline,
    last_values: [u16; CHANNEL_COUNT],
    selector: ChannelSelector,
    state: CoordinatorState,
    selection_timeout: Duration,
}

impl<'a> Coordinator<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            last_values: [0; CHANNEL_COUNT],
            selector: ChannelSelector::default(),
            state: CoordinatorState::WaitingForSamples,
            selection_timeout: Duration::from_millis(SELECTION_TIMEOUT_MS),
        }
    }

    pub fn with_selection_timeout(mut self, timeout: Duration) -> Self {
        self.selection_timeout = timeout;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn selector(&self) -> ChannelSelector {
        self.selector
    }

    pub fn last_value(&self, channel: Channel) -> u16 {
        self.last_values[channel.index()]
    }

    /// Run one full cycle: wait, drain, check selection, forward
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.state = CoordinatorState::WaitingForSamples;
        let ready = self.pipeline.channel_ready.wait_any(ALL_BITS).await;

        self.state = CoordinatorState::DrainingSamples;
        self.drain(ready, &mut report.drained);

        self.state = CoordinatorState::CheckingSelection;
        report.selected = self.check_selection().await;

        self.state = CoordinatorState::Forwarding;
        report.forwarded = self.last_values[self.selector.channel().index()];
        self.pipeline.output.send(report.forwarded).await;

        self.state = CoordinatorState::WaitingForSamples;
        report
    }

    /// Run cycles forever
    pub async fn run(mut self) {
        info!("Coordinator started (selector {})", self.selector.get());

        loop {
            let report = self.run_cycle().await;
            trace!(
                "Cycle: drained {} sample(s), forwarded {}",
                report.drained.len(),
                report.forwarded
            );
        }
    }

    // One sample per bit observed at wake time. The handler raises a bit only
    // after its enqueue succeeded, so the message is already visible here and
    // the dequeue never has to wait. An empty queue means the message behind
    // the bit was taken by an earlier backlog drain.
    fn drain(&mut self, ready: u8, drained: &mut Vec<Sample, DRAIN_CAPACITY>) {
        for channel in Channel::ALL {
            if ready & channel.mask() == 0 {
                continue;
            }

            match self.pipeline.samples.try_receive() {
                Ok(sample) => self.store(sample, drained),
                Err(_) => debug!("Ready bit for {} had no pending sample", channel),
            }
            self.pipeline.channel_ready.clear(channel.mask());
        }

        // Backlog left behind by ready bits that were raised again before being
        // cleared (queue overflow, stalled coordinator). The interrupt enqueues
        // and flags as one unit, so clearing the drained sample's own bit keeps
        // flags and queue in step. Bounded by what is queued now; later arrivals
        // wait for the next cycle.
        let backlog = self.pipeline.samples.len();
        for _ in 0..backlog {
            let Ok(sample) = self.pipeline.samples.try_receive() else {
                break;
            };
            self.store(sample, drained);
            // A same-channel sample queued between the receive and this clear
            // loses its bit; it stays queued and drains on the next wake.
            self.pipeline.channel_ready.clear(sample.channel.mask());
        }
    }

    fn store(&mut self, sample: Sample, drained: &mut Vec<Sample, DRAIN_CAPACITY>) {
        self.last_values[sample.channel.index()] = sample.value;
        debug!("Drained {} = {}", sample.channel, sample.value);
        let _ = drained.push(sample);
    }

    // Lowest pending bit wins; any others stay set for later cycles.
    async fn check_selection(&mut self) -> Option<ChannelSelector> {
        let pending = self
            .pipeline
            .selection
            .wait_any_timeout(ALL_BITS, self.selection_timeout)
            .await?;

        let selector = ChannelSelector::from_flags(pending)?;
        self.pipeline.selection.clear(selector.mask());

        if selector != self.selector {
            info!("Active channel: {} -> {}", self.selector.get(), selector.get());
            self.selector = selector;
        }
        Some(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ConversionHandler;
    use crate::config::OUTPUT_QUEUE_LEN;
    use embassy_futures::block_on;
    use embassy_time::with_timeout;

    fn feed(pipeline: &Pipeline, channel: u8, value: u16) {
        ConversionHandler::new(pipeline)
            .on_conversion_complete(channel, value << 3)
            .unwrap();
    }

    fn coordinator(pipeline: &Pipeline) -> Coordinator<'_> {
        Coordinator::new(pipeline).with_selection_timeout(Duration::from_millis(1))
    }

    #[test]
    fn drains_every_flagged_channel_before_forwarding() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        for (channel, value) in [(0, 120), (1, 15), (2, 80), (3, 511)] {
            feed(&pipeline, channel, value);
        }

        let report = block_on(coordinator.run_cycle());

        assert_eq!(report.drained.len(), 4);
        assert_eq!(report.forwarded, 120);
        assert_eq!(coordinator.last_value(Channel::Ch2), 80);
        assert_eq!(coordinator.last_value(Channel::Ch3), 511);
        assert_eq!(pipeline.channel_ready.get(), 0);
        assert!(pipeline.samples.is_empty());
        assert_eq!(pipeline.output.try_receive().ok(), Some(120));
        assert_eq!(coordinator.state(), CoordinatorState::WaitingForSamples);
    }

    #[test]
    fn single_channel_wake_leaves_other_slots_untouched() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        feed(&pipeline, 3, 42);

        let report = block_on(coordinator.run_cycle());

        assert_eq!(report.drained.as_slice(), &[Sample::new(Channel::Ch3, 42)]);
        assert_eq!(coordinator.last_value(Channel::Ch0), 0);
        // selector 1 still forwards channel 0's initial value
        assert_eq!(report.forwarded, 0);
    }

    #[test]
    fn lowest_selection_bit_wins_and_rest_stay_pending() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        feed(&pipeline, 1, 10);
        feed(&pipeline, 3, 30);
        pipeline.selection.set(0b1010);

        let report = block_on(coordinator.run_cycle());
        assert_eq!(report.selected.map(|s| s.get()), Some(2));
        assert_eq!(report.forwarded, 10);
        assert_eq!(pipeline.selection.get(), 0b1000);

        feed(&pipeline, 0, 5);
        let report = block_on(coordinator.run_cycle());
        assert_eq!(report.selected.map(|s| s.get()), Some(4));
        assert_eq!(report.forwarded, 30);
        assert_eq!(pipeline.selection.get(), 0);
    }

    #[test]
    fn reselecting_the_active_channel_is_idempotent() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);

        for value in [100, 101] {
            feed(&pipeline, 0, value);
            pipeline.selection.set(0b0001);
            let report = block_on(coordinator.run_cycle());
            assert_eq!(coordinator.selector().get(), 1);
            assert_eq!(report.forwarded, value);
        }

        // exactly one forward per cycle
        assert_eq!(pipeline.output.len(), 2);
    }

    #[test]
    fn no_selection_times_out_and_keeps_selector() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        feed(&pipeline, 0, 7);

        let report = block_on(coordinator.run_cycle());
        assert_eq!(report.selected, None);
        assert_eq!(coordinator.selector(), ChannelSelector::default());
    }

    #[test]
    fn ready_bit_without_sample_is_cleared_and_still_forwards() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        pipeline.channel_ready.set(Channel::Ch2.mask());

        let report = block_on(coordinator.run_cycle());

        assert!(report.drained.is_empty());
        assert_eq!(pipeline.channel_ready.get(), 0);
        assert_eq!(report.forwarded, 0);
        assert_eq!(pipeline.output.len(), 1);
    }

    #[test]
    fn unflagged_sample_drains_on_next_wake() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        // queued without its ready bit
        pipeline.samples.try_send(Sample::new(Channel::Ch0, 12)).unwrap();
        feed(&pipeline, 1, 34);

        let report = block_on(coordinator.run_cycle());

        assert_eq!(
            report.drained.as_slice(),
            &[Sample::new(Channel::Ch0, 12), Sample::new(Channel::Ch1, 34)]
        );
        assert_eq!(report.forwarded, 12);
        assert!(pipeline.samples.is_empty());
        assert_eq!(pipeline.channel_ready.get(), 0);
    }

    #[test]
    fn full_output_queue_holds_forwarding_until_space_frees() {
        let pipeline = Pipeline::new();
        let mut coordinator = coordinator(&pipeline);
        for value in 0..OUTPUT_QUEUE_LEN as u16 {
            feed(&pipeline, 0, value);
            block_on(coordinator.run_cycle());
        }
        assert!(pipeline.output.is_full());

        feed(&pipeline, 0, 99);
        let report = {
            let mut cycle = core::pin::pin!(coordinator.run_cycle());
            let stalled = block_on(with_timeout(Duration::from_millis(50), cycle.as_mut()));
            assert!(stalled.is_err());
            assert_eq!(pipeline.output.len(), OUTPUT_QUEUE_LEN);

            assert_eq!(pipeline.output.try_receive().ok(), Some(0));
            block_on(cycle)
        };
        assert_eq!(report.forwarded, 99);
        assert_eq!(pipeline.output.len(), OUTPUT_QUEUE_LEN);
        assert_eq!(coordinator.state(), CoordinatorState::WaitingForSamples);
    }
}
