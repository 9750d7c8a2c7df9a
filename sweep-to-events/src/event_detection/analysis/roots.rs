//! Rise and decay crossings of a target value within one waveform.
use super::two_state_levels;
use crate::{
    event_detection::{Real, first_argmax},
    parameters::{DecayInterceptStrategy, DecayReferenceLevel, FeatureParameters},
};
use ephys_common::{SampleIndex, SampleSeries};

/// Estimate used for the decay root when the falling phase never drops below the target value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayFallback {
    /// Extrapolate the falling slope at the given level down to the target value.
    Linear(DecayReferenceLevel),
    /// The first falling-phase sample at or below the lower histogram state.
    Levels { bins: usize },
}

/// Times at which a waveform crosses a value. A missing rise root implies a
/// missing decay root.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Roots {
    pub rise: Option<Real>,
    pub decay: Option<Real>,
}

impl Roots {
    pub fn duration(&self) -> Option<Real> {
        Some(self.decay? - self.rise?)
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct RootFinder {
    interpolate: bool,
    fallback: Option<DecayFallback>,
}

impl RootFinder {
    pub fn new(interpolate: bool) -> Self {
        Self {
            interpolate,
            fallback: None,
        }
    }

    pub fn with_fallback(self, fallback: DecayFallback) -> Self {
        Self {
            fallback: Some(fallback),
            ..self
        }
    }

    pub fn from_parameters(parameters: &FeatureParameters) -> Self {
        let fallback = match parameters.decay_intercept_strategy {
            DecayInterceptStrategy::Linear => {
                DecayFallback::Linear(parameters.decay_reference_level)
            }
            DecayInterceptStrategy::Levels => DecayFallback::Levels {
                bins: parameters.histogram_bins,
            },
        };
        Self::new(parameters.interpolate_roots).with_fallback(fallback)
    }

    /// Finds the crossings of `value` around the first maximum at or after `onset`.
    ///
    /// The rise root is the first sample from `onset` to the peak at or above
    /// `value`. The decay root is the first sample after the peak below `value`.
    pub fn roots(&self, waveform: &SampleSeries, onset: SampleIndex, value: Real) -> Roots {
        let values = waveform.values();
        let onset = onset.min(values.len() - 1);
        let Some((peak, _)) = first_argmax(&values[onset..]).map(|(i, v)| (onset + i, v)) else {
            return Roots::default();
        };
        let Some(rise) = (onset..=peak).find(|&i| values[i] >= value) else {
            return Roots::default();
        };
        let rise = match rise.checked_sub(1) {
            Some(before) if self.interpolate && values[before] < value => {
                interpolate(waveform, before, value)
            }
            _ => waveform.time_at(rise),
        };

        let decay = match first_below(values, peak, value) {
            Some(after) if self.interpolate => Some(interpolate(waveform, after - 1, value)),
            Some(after) => Some(waveform.time_at(after)),
            None => self.fallback.and_then(|fallback| match fallback {
                DecayFallback::Linear(level) => linear_decay(waveform, onset, peak, level, value),
                DecayFallback::Levels { bins } => levels_decay(waveform, peak, bins),
            }),
        };
        Roots {
            rise: Some(rise),
            decay,
        }
    }
}

/// Index of the first sample after `peak` strictly below `value`.
fn first_below(values: &[Real], peak: SampleIndex, value: Real) -> Option<SampleIndex> {
    values
        .iter()
        .skip(peak + 1)
        .position(|v| *v < value)
        .map(|i| peak + 1 + i)
}

/// Time at which the line through samples `i` and `i + 1` takes `value`.
fn interpolate(waveform: &SampleSeries, i: SampleIndex, value: Real) -> Real {
    let values = waveform.values();
    let (a, b) = (values[i], values[i + 1]);
    if a == b {
        waveform.time_at(i + 1)
    } else {
        waveform.time_at(i) + (value - a) / (b - a) * waveform.dt()
    }
}

fn linear_decay(
    waveform: &SampleSeries,
    onset: SampleIndex,
    peak: SampleIndex,
    level: DecayReferenceLevel,
    value: Real,
) -> Option<Real> {
    let values = waveform.values();
    let onset_value = values[onset];
    let amplitude = values[peak] - onset_value;
    let reference = match level {
        DecayReferenceLevel::HalfMax => onset_value + amplitude / 2.0,
        DecayReferenceLevel::QuarterMax => onset_value + amplitude / 4.0,
        DecayReferenceLevel::Zero => 0.0,
        DecayReferenceLevel::Scalar(reference) => reference,
    };
    if !(values[peak] >= reference) {
        return None;
    }
    let crossing = first_below(values, peak, reference)?;
    let previous = values[crossing - 1];
    let slope = (values[crossing] - previous) / waveform.dt();
    (slope < 0.0).then(|| waveform.time_at(crossing - 1) + (value - previous) / slope)
}

fn levels_decay(waveform: &SampleSeries, peak: SampleIndex, bins: usize) -> Option<Real> {
    let values = waveform.values();
    let (lower, _) = two_state_levels(values, bins)?;
    values
        .iter()
        .skip(peak + 1)
        .position(|v| *v <= lower)
        .map(|i| waveform.time_at(peak + 1 + i))
}
