use crate::{
    event_detection::{
        Real,
        datatype::{DetectedEvent, Waveform},
        detectors::action_potential::ActionPotential,
    },
    metrics,
    parameters::ExtractionParameters,
};
use ephys_common::{SampleSeries, metrics::detector_kind::DetectorKind};
use itertools::Itertools;
use tracing::debug;

/// Smallest interval between consecutive onsets, if there are at least two events.
fn min_inter_onset_interval(events: &[ActionPotential]) -> Option<Real> {
    events
        .iter()
        .tuple_windows()
        .map(|(a, b)| b.event.onset_time() - a.event.onset_time())
        .reduce(Real::min)
}

/// Copies the samples from `before` ahead of each onset to `after` past it,
/// inclusive. Events whose window does not lie within `series` are dropped.
#[tracing::instrument(skip_all, fields(num_events = events.len(), num_extracted))]
pub fn extract_action_potentials(
    series: &SampleSeries,
    events: &[ActionPotential],
    parameters: &ExtractionParameters,
) -> Vec<(DetectedEvent, Waveform)> {
    let after = match min_inter_onset_interval(events) {
        Some(isi) if parameters.use_min_detected_isi => parameters.after.min(isi),
        _ => parameters.after,
    };
    let before_samples = (parameters.before / series.dt()).round() as usize;
    let after_samples = (after / series.dt()).round() as usize;

    let extracted: Vec<_> = events
        .iter()
        .filter_map(|action_potential| {
            let window = action_potential
                .onset_index
                .checked_sub(before_samples)
                .map(|start| (start, action_potential.onset_index + after_samples + 1));
            match window.map(|(start, end)| series.slice(start, end)) {
                Some(Ok(slice)) => Some((action_potential.event, Waveform::new(slice, before_samples))),
                _ => {
                    debug!(
                        "Waveform of event at {} exceeds the series",
                        action_potential.event.onset_time()
                    );
                    metrics::record_dropped_window(DetectorKind::ActionPotential);
                    None
                }
            }
        })
        .collect();
    tracing::Span::current().record("num_extracted", extracted.len());
    extracted
}
