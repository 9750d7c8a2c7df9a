//! Derivative-threshold detection of action potential onsets.
//!
//! Candidate onsets are the starts of the runs where the smoothed first
//! derivative is at or above `derivative_threshold`. Each candidate owns the
//! interval up to the next candidate (or the end of the sweep), and is
//! rejected if the trace never exceeds `vm_threshold` within it, or if the
//! derivative peaks too soon after the onset.
use super::{at_or_above, threshold_regions};
use crate::{
    DetectionResult,
    event_detection::{
        Real, datatype::DetectedEvent, differentiator::Differentiator, first_argmax, first_argmin,
    },
    metrics,
    parameters::ActionPotentialParameters,
};
use ephys_common::{
    SampleIndex, SampleSeries,
    metrics::{detector_kind::DetectorKind, rejections::RejectionKind},
};
use std::iter::once;
use tracing::{debug, trace};

const KIND: DetectorKind = DetectorKind::ActionPotential;

/// An accepted event, together with the index of its onset in the trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionPotential {
    pub onset_index: SampleIndex,
    pub event: DetectedEvent,
}

#[derive(Debug, Clone)]
pub struct ActionPotentialDetector {
    parameters: ActionPotentialParameters,
}

impl ActionPotentialDetector {
    pub fn new(parameters: ActionPotentialParameters) -> DetectionResult<Self> {
        parameters.validate()?;
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &ActionPotentialParameters {
        &self.parameters
    }

    /// Returns the accepted events in onset order.
    #[tracing::instrument(skip_all, fields(len = series.len(), num_candidates, num_events))]
    pub fn detect(&self, series: &SampleSeries) -> DetectionResult<Vec<ActionPotential>> {
        let smoothing = self.parameters.smoothing_for(series.dt());
        let dv = Differentiator::new(smoothing).first_derivative(series)?;
        let candidates: Vec<SampleIndex> = threshold_regions(
            dv.values(),
            at_or_above(self.parameters.derivative_threshold),
        )
        .into_iter()
        .map(|region| region.start)
        .collect();
        tracing::Span::current().record("num_candidates", candidates.len());
        metrics::record_candidates(KIND, candidates.len());

        let scan = CandidateScan {
            trace: series,
            dv: dv.values(),
            offset: smoothing.map(|s| s.half_width()).unwrap_or_default(),
            vm_threshold: self.parameters.vm_threshold,
            min_fast_rise_duration: self
                .parameters
                .min_fast_rise_duration
                .unwrap_or(10.0 * series.dt()),
        };
        let next_candidates = candidates.iter().skip(1).copied().map(Some).chain(once(None));
        let accepted: Vec<ActionPotential> = candidates
            .iter()
            .copied()
            .zip(next_candidates)
            .filter_map(|(start, next)| match scan.evaluate(start, next) {
                Ok(action_potential) => Some(action_potential),
                Err(reason) => {
                    debug!(
                        "Candidate at {} rejected: {reason:?}",
                        series.time_at(start + scan.offset)
                    );
                    metrics::record_rejection(KIND, reason);
                    None
                }
            })
            .collect();

        let events = match self.parameters.min_inter_event_interval {
            Some(min_interval) => enforce_min_interval(accepted, min_interval),
            None => accepted,
        };
        tracing::Span::current().record("num_events", events.len());
        metrics::record_events(KIND, events.len());
        Ok(events)
    }
}

/// Drops each event whose onset follows the previous kept onset by less than `min_interval`.
fn enforce_min_interval(events: Vec<ActionPotential>, min_interval: Real) -> Vec<ActionPotential> {
    let mut kept: Vec<ActionPotential> = Vec::with_capacity(events.len());
    for action_potential in events {
        let onset_time = action_potential.event.onset_time();
        match kept.last() {
            Some(last) if onset_time - last.event.onset_time() < min_interval => {
                trace!("Event at {onset_time} is within {min_interval} of the previous event");
                metrics::record_rejection(KIND, RejectionKind::InterEventInterval);
            }
            _ => kept.push(action_potential),
        }
    }
    kept
}

/// Shared state for evaluating each candidate onset.
/// Index `j` of `dv` corresponds to index `j + offset` of the trace.
struct CandidateScan<'a> {
    trace: &'a SampleSeries,
    dv: &'a [Real],
    offset: usize,
    vm_threshold: Real,
    min_fast_rise_duration: Real,
}

impl CandidateScan<'_> {
    /// `start` and `next` are indices into `dv`.
    fn evaluate(
        &self,
        start: SampleIndex,
        next: Option<SampleIndex>,
    ) -> Result<ActionPotential, RejectionKind> {
        let dv_end = next.unwrap_or(self.dv.len());
        let onset_index = start + self.offset;
        let trace_end = next
            .map(|n| n + self.offset)
            .unwrap_or(self.trace.len());
        let interval = self
            .trace
            .values()
            .get(onset_index..trace_end)
            .unwrap_or_default();

        let (peak_offset, peak_value) =
            first_argmax(interval).ok_or(RejectionKind::SubThreshold)?;
        if !(peak_value > self.vm_threshold) {
            return Err(RejectionKind::SubThreshold);
        }

        let fast_rise = self.fast_rise_end(start, dv_end) - start;
        if (fast_rise as Real) * self.trace.dt() < self.min_fast_rise_duration {
            return Err(RejectionKind::ShortFastRise);
        }

        let onset_value = interval.first().copied().unwrap_or(peak_value);
        let peak_index = onset_index + peak_offset;
        let end_time = interval
            .iter()
            .skip(peak_offset + 1)
            .position(|v| *v <= onset_value)
            .map(|i| self.trace.time_at(peak_index + 1 + i));

        let dv_peak = (peak_index - self.offset).min(self.dv.len());
        let rise_slope = self
            .dv
            .get(start..dv_peak)
            .and_then(first_argmax)
            .map(|(_, slope)| slope);
        let decay_slope = self
            .dv
            .get(dv_peak..dv_end)
            .and_then(first_argmin)
            .map(|(_, slope)| slope);

        Ok(ActionPotential {
            onset_index,
            event: DetectedEvent::new(
                self.trace.time_at(onset_index),
                self.trace.time_at(peak_index),
            )
            .with_end_time(end_time)
            .with_slopes(rise_slope, decay_slope),
        })
    }

    /// Index of the first local maximum of `dv` in `start..end`, or the
    /// interval's maximum if there is none.
    fn fast_rise_end(&self, start: SampleIndex, end: SampleIndex) -> SampleIndex {
        let is_local_max = |j: SampleIndex| {
            let Some(value) = self.dv.get(j) else {
                return false;
            };
            let rising = j == 0 || self.dv.get(j - 1).is_some_and(|prev| value >= prev);
            let falling = self.dv.get(j + 1).is_some_and(|next| value > next);
            rising && falling
        };
        (start..end)
            .find(|j| is_local_max(*j))
            .or_else(|| {
                self.dv
                    .get(start..end)
                    .and_then(first_argmax)
                    .map(|(i, _)| start + i)
            })
            .unwrap_or(start)
    }
}
