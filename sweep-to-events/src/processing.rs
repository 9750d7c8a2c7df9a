use crate::{
    DetectionResult,
    event_detection::{
        analysis::{FeatureAnalyzer, extract_action_potentials},
        datatype::EventTrain,
        detectors::{ActionPotentialDetector, SlidingTemplateDetector},
    },
    metrics,
    parameters::ActionPotentialSettings,
    sweeps::{SweepOutcome, SweepRecord},
};
use ephys_common::{
    IntoSampleSeries, SampleSeries,
    metrics::{detector_kind::DetectorKind, failures::FailureKind},
};
use rayon::prelude::*;
use tracing::warn;

/// A fully configured detector, applied identically to every sweep.
#[derive(Debug, Clone)]
pub enum Detection {
    ActionPotential(ActionPotentialSettings),
    Template {
        detector: SlidingTemplateDetector,
        extract_from_raw: bool,
    },
}

impl Detection {
    fn kind(&self) -> DetectorKind {
        match self {
            Detection::ActionPotential(_) => DetectorKind::ActionPotential,
            Detection::Template { .. } => DetectorKind::SlidingTemplate,
        }
    }
}

/// Detects action potentials, extracts their waveforms and measures each one.
pub fn find_action_potentials(
    series: &SampleSeries,
    settings: &ActionPotentialSettings,
) -> DetectionResult<EventTrain> {
    settings.extraction.validate()?;
    let detector = ActionPotentialDetector::new(settings.detection.clone())?;
    let analyzer = FeatureAnalyzer::new(&settings.features, series.value_unit())?;

    let events = detector.detect(series)?;
    let mut train = EventTrain::empty();
    for (event, waveform) in extract_action_potentials(series, &events, &settings.extraction) {
        let features = analyzer.analyze(&waveform);
        train.push(event, waveform, features);
    }
    Ok(train)
}

pub fn find_template_events(
    series: &SampleSeries,
    extraction: Option<&SampleSeries>,
    detector: &SlidingTemplateDetector,
) -> DetectionResult<EventTrain> {
    detector.detect(series, extraction)
}

#[tracing::instrument(skip_all, fields(name = sweep.name.as_str(), num_events))]
fn process_sweep(sweep: &SweepRecord, detection: &Detection) -> SweepOutcome {
    let failed = |kind: FailureKind, error: String| {
        warn!("Sweep {} failed: {error}", sweep.name);
        metrics::record_failure(kind);
        SweepOutcome {
            name: sweep.name.clone(),
            events: None,
            error: Some(error),
        }
    };

    let series = match sweep.into_sample_series() {
        Ok(series) => series,
        Err(e) => return failed(FailureKind::InvalidSweep, e.to_string()),
    };
    let result = match detection {
        Detection::ActionPotential(settings) => find_action_potentials(&series, settings),
        Detection::Template {
            detector,
            extract_from_raw,
        } => match sweep.raw_series().filter(|_| *extract_from_raw).transpose() {
            Ok(raw) => find_template_events(&series, raw.as_ref(), detector),
            Err(e) => return failed(FailureKind::InvalidSweep, e.to_string()),
        },
    };
    metrics::record_sweep(detection.kind());
    match result {
        Ok(train) => {
            tracing::Span::current().record("num_events", train.len());
            SweepOutcome {
                name: sweep.name.clone(),
                events: Some(train),
                error: None,
            }
        }
        Err(e) => failed(FailureKind::DetectionFailed, e.to_string()),
    }
}

/// Processes each sweep independently, in parallel. The outcomes are in the order of `sweeps`.
pub fn process_sweeps(sweeps: &[SweepRecord], detection: &Detection) -> Vec<SweepOutcome> {
    sweeps
        .par_iter()
        .map(|sweep| process_sweep(sweep, detection))
        .collect()
}
