use super::RootFinder;
use crate::{
    DetectionError, DetectionResult,
    event_detection::{
        Real,
        datatype::{Feature, FeatureSet, Waveform},
        differentiator::Differentiator,
        first_argmax,
    },
    parameters::{FeatureParameters, ReferenceLevel},
};
use ephys_common::Unit;

/// Measures amplitudes and durations of waveforms with a known onset.
#[derive(Debug, Clone)]
pub struct FeatureAnalyzer {
    root_finder: RootFinder,
    reference_level: Option<ReferenceLevel>,
}

impl FeatureAnalyzer {
    /// Fails if the reference level's unit differs from `value_unit`.
    pub fn new(parameters: &FeatureParameters, value_unit: &Unit) -> DetectionResult<Self> {
        parameters.validate()?;
        if let Some(level) = parameters
            .reference_level
            .as_ref()
            .filter(|level| level.unit != *value_unit)
        {
            return Err(DetectionError::IncompatibleUnits {
                expected: value_unit.clone(),
                found: level.unit.clone(),
            });
        }
        Ok(Self {
            root_finder: RootFinder::from_parameters(parameters),
            reference_level: parameters.reference_level.clone(),
        })
    }

    pub fn analyze(&self, waveform: &Waveform) -> FeatureSet {
        let series = waveform.series();
        let onset = waveform.onset_index();
        let value_unit = series.value_unit();
        let time_unit = series.time_unit();

        let mut features = FeatureSet::default();
        let Some(&onset_value) = series.values().get(onset) else {
            return features;
        };
        let Some((_, peak_value)) = series.values().get(onset..).and_then(first_argmax) else {
            return features;
        };
        let amplitude = peak_value - onset_value;
        let half_max = onset_value + amplitude / 2.0;
        let quarter_max = onset_value + amplitude / 4.0;

        features.insert(Feature::OnsetValue, Some(onset_value), value_unit);
        features.insert(Feature::PeakValue, Some(peak_value), value_unit);
        features.insert(Feature::Amplitude, Some(amplitude), value_unit);
        features.insert(Feature::HalfMaxValue, Some(half_max), value_unit);
        features.insert(Feature::QuarterMaxValue, Some(quarter_max), value_unit);

        let duration_at = |level: Real| self.root_finder.roots(series, onset, level).duration();
        features.insert(Feature::DurationAtZero, duration_at(0.0), time_unit);
        features.insert(Feature::DurationAtOnset, duration_at(onset_value), time_unit);
        features.insert(Feature::HalfMaxDuration, duration_at(half_max), time_unit);
        features.insert(Feature::QuarterMaxDuration, duration_at(quarter_max), time_unit);
        if let Some(level) = &self.reference_level {
            let value = if level.relative {
                onset_value + level.value
            } else {
                level.value
            };
            features.insert(Feature::ReferenceLevelDuration, duration_at(value), time_unit);
        }

        let max_rate_of_rise = Differentiator::default()
            .first_derivative(series)
            .ok()
            .and_then(|dv| first_argmax(dv.values()).map(|(_, rate)| rate));
        features.insert(
            Feature::MaxRateOfRise,
            max_rate_of_rise,
            &value_unit.per(time_unit),
        );
        features
    }
}
