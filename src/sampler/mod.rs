//! Sampling task: the consumer side of the bridge
//!
//! The task is driven by an external periodic scheduler and never schedules itself.
//! Each call takes at most one slot from the ring channel and mirrors it into the
//! output registry. It performs no allocation, locking or I/O, so it can run inside
//! a real-time thread.
//!
//! Staleness is tracked independently of channel occupancy: every empty period
//! counts down the remaining timeout, and `data-valid` drops when it reaches zero.

use std::time::Duration;

use tracing::trace;

use crate::ring::Consumer;

pub mod pins;

pub use pins::FrameOutputs;

/// What a single sampling period did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// A valid slot was consumed and every output updated.
    Fresh { sequence: u32 },
    /// An invalid slot was consumed; only status outputs changed.
    Rejected { sequence: u32 },
    /// Nothing pending, timeout not yet expired.
    Holding,
    /// Nothing pending and the timeout has expired; `data-valid` is false.
    Stale,
}

/// Consumer-local staleness bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingState {
    timeout_remaining: Duration,
}

impl SamplingState {
    pub fn timeout_remaining(&self) -> Duration {
        self.timeout_remaining
    }

    /// Counts down one empty period and returns whether the timeout has expired.
    fn elapse(&mut self, period: Duration) -> bool {
        self.timeout_remaining = self.timeout_remaining.saturating_sub(period);
        self.timeout_remaining.is_zero()
    }

    fn rearm(&mut self, timeout: Duration) {
        self.timeout_remaining = timeout;
    }
}

/// One sampling task bound to a consumer handle and its outputs
pub struct SamplingTask<'a> {
    consumer: Consumer<'a>,
    outputs: FrameOutputs,
    timeout: Duration,
    state: SamplingState,
}

impl<'a> SamplingTask<'a> {
    /// Creates the task. Starts out expired, so outputs read invalid until the
    /// first slot arrives.
    pub fn new(consumer: Consumer<'a>, outputs: FrameOutputs, timeout: Duration) -> Self {
        Self { consumer, outputs, timeout, state: SamplingState::default() }
    }

    /// Runs one control period of length `period`.
    pub fn sample(&mut self, period: Duration) -> SampleOutcome {
        let Some(slot) = self.consumer.try_consume() else {
            if self.state.elapse(period) {
                self.outputs.set_data_valid(false);
                return SampleOutcome::Stale;
            }
            return SampleOutcome::Holding;
        };

        self.state.rearm(self.timeout);
        self.outputs.publish_status(&slot);
        trace!(sequence = slot.sequence, valid = slot.valid, "Slot consumed");

        if !slot.valid {
            return SampleOutcome::Rejected { sequence: slot.sequence };
        }
        self.outputs.publish_frame(&slot.frame);
        SampleOutcome::Fresh { sequence: slot.sequence }
    }

    pub fn state(&self) -> SamplingState {
        self.state
    }

    pub fn outputs(&self) -> &FrameOutputs {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{OutputRegistry, OutputValue};
    use crate::ring::HeapChannel;
    use crate::test_utils::sample_frame;
    use crate::types::TelemetryFrame;

    const TIMEOUT: Duration = Duration::from_millis(3000);
    const PERIOD: Duration = Duration::from_millis(1);

    fn float(registry: &OutputRegistry, name: &str) -> f64 {
        match registry.get(name) {
            Some(OutputValue::Float(value)) => value,
            other => panic!("{name}: {other:?}"),
        }
    }

    #[test]
    fn data_valid_drops_exactly_when_timeout_elapses() {
        let mut registry = OutputRegistry::new();
        let outputs = FrameOutputs::register(&mut registry, "fgfdm").unwrap();
        let mut channel = HeapChannel::new();
        let (producer, consumer) = channel.split();
        let mut task = SamplingTask::new(consumer, outputs, TIMEOUT);

        producer.try_publish(&sample_frame(), 10, 0, true).unwrap();
        assert_eq!(task.sample(PERIOD), SampleOutcome::Fresh { sequence: 0 });
        assert_eq!(task.state().timeout_remaining(), TIMEOUT);

        for _ in 1..3000 {
            assert_eq!(task.sample(PERIOD), SampleOutcome::Holding);
            assert_eq!(registry.get("fgfdm.data-valid"), Some(OutputValue::Bit(true)));
        }
        assert_eq!(task.sample(PERIOD), SampleOutcome::Stale);
        assert_eq!(registry.get("fgfdm.data-valid"), Some(OutputValue::Bit(false)));
        assert_eq!(task.sample(PERIOD), SampleOutcome::Stale);
    }

    #[test]
    fn uneven_periods_saturate_at_zero() {
        let mut registry = OutputRegistry::new();
        let outputs = FrameOutputs::register(&mut registry, "fgfdm").unwrap();
        let mut channel = HeapChannel::new();
        let (producer, consumer) = channel.split();
        let mut task = SamplingTask::new(consumer, outputs, Duration::from_millis(5));

        producer.try_publish(&sample_frame(), 10, 0, true).unwrap();
        task.sample(PERIOD);
        assert_eq!(task.sample(Duration::from_millis(3)), SampleOutcome::Holding);
        assert_eq!(task.sample(Duration::from_millis(3)), SampleOutcome::Stale);
        assert_eq!(task.state().timeout_remaining(), Duration::ZERO);
    }

    #[test]
    fn engine_outputs_follow_decoded_count() {
        let mut registry = OutputRegistry::new();
        let outputs = FrameOutputs::register(&mut registry, "fgfdm").unwrap();
        let mut channel = HeapChannel::new();
        let (producer, consumer) = channel.split();
        let mut task = SamplingTask::new(consumer, outputs, TIMEOUT);

        let mut four = TelemetryFrame { num_engines: 4, ..sample_frame() };
        for (i, engine) in four.engine.iter_mut().enumerate() {
            engine.rpm = 1000.0 * (i + 1) as f32;
        }
        producer.try_publish(&four, 1, 0, true).unwrap();
        task.sample(PERIOD);

        let mut three = TelemetryFrame { num_engines: 3, ..sample_frame() };
        three.engine[0].rpm = 2100.0;
        three.engine[1].rpm = 2200.0;
        three.engine[2].rpm = 2300.0;
        three.engine[3] = Default::default();
        producer.try_publish(&three, 2, 1, true).unwrap();
        assert_eq!(task.sample(PERIOD), SampleOutcome::Fresh { sequence: 1 });

        assert_eq!(registry.get("fgfdm.engine.num_engines"), Some(OutputValue::U32(3)));
        assert_eq!(float(&registry, "fgfdm.engine.0.rpm"), 2100.0);
        assert_eq!(float(&registry, "fgfdm.engine.1.rpm"), 2200.0);
        assert_eq!(float(&registry, "fgfdm.engine.2.rpm"), 2300.0);
        assert_eq!(float(&registry, "fgfdm.engine.3.rpm"), 4000.0, "index 3 keeps its value");
    }

    #[test]
    fn invalid_slot_updates_status_only() {
        let mut registry = OutputRegistry::new();
        let outputs = FrameOutputs::register(&mut registry, "fgfdm").unwrap();
        let mut channel = HeapChannel::new();
        let (producer, consumer) = channel.split();
        let mut task = SamplingTask::new(consumer, outputs, TIMEOUT);

        producer.try_publish(&sample_frame(), 100, 4, true).unwrap();
        task.sample(PERIOD);
        let before: Vec<_> = registry
            .iter()
            .filter(|(name, _)| !matches!(*name, "fgfdm.data-valid" | "fgfdm.timestamp" | "fgfdm.msgno"))
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        producer.try_publish(&TelemetryFrame::default(), 250, 5, false).unwrap();
        assert_eq!(task.sample(PERIOD), SampleOutcome::Rejected { sequence: 5 });

        assert_eq!(registry.get("fgfdm.data-valid"), Some(OutputValue::Bit(false)));
        assert_eq!(registry.get("fgfdm.timestamp"), Some(OutputValue::U32(250)));
        assert_eq!(registry.get("fgfdm.msgno"), Some(OutputValue::U32(5)));
        for (name, value) in before {
            assert_eq!(registry.get(&name), Some(value), "{name} changed");
        }
        assert_eq!(task.state().timeout_remaining(), TIMEOUT, "invalid slots still rearm");
    }

    #[test]
    fn starts_out_stale() {
        let mut registry = OutputRegistry::new();
        let outputs = FrameOutputs::register(&mut registry, "fgfdm").unwrap();
        let mut channel = HeapChannel::new();
        let (_producer, consumer) = channel.split();
        let mut task = SamplingTask::new(consumer, outputs, TIMEOUT);

        assert_eq!(task.sample(PERIOD), SampleOutcome::Stale);
        assert!(!task.outputs().data_valid());
    }
}
