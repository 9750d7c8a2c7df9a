use super::FeatureSet;
use crate::event_detection::Real;
use ephys_common::{SampleIndex, SampleSeries};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result};

/// A single detected transient. Times are in the time unit of the series it
/// was detected in.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectedEvent {
    onset_time: Real,
    peak_time: Real,
    end_time: Option<Real>,
    rise_slope: Option<Real>,
    decay_slope: Option<Real>,
}

impl DetectedEvent {
    pub fn new(onset_time: Real, peak_time: Real) -> Self {
        Self {
            onset_time,
            peak_time,
            ..Default::default()
        }
    }

    pub fn with_end_time(self, end_time: Option<Real>) -> Self {
        Self { end_time, ..self }
    }

    pub fn with_slopes(self, rise_slope: Option<Real>, decay_slope: Option<Real>) -> Self {
        Self {
            rise_slope,
            decay_slope,
            ..self
        }
    }

    pub fn onset_time(&self) -> Real {
        self.onset_time
    }

    pub fn peak_time(&self) -> Real {
        self.peak_time
    }

    pub fn end_time(&self) -> Option<Real> {
        self.end_time
    }

    pub fn rise_slope(&self) -> Option<Real> {
        self.rise_slope
    }

    pub fn decay_slope(&self) -> Option<Real> {
        self.decay_slope
    }
}

impl Display for DetectedEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{},{}", self.onset_time, self.peak_time)?;
        if let Some(end_time) = self.end_time {
            write!(f, ",{end_time}")?;
        }
        Ok(())
    }
}

/// An owned copy of the samples surrounding one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    series: SampleSeries,
    onset_index: SampleIndex,
}

impl Waveform {
    /// `onset_index` is relative to the start of `series`, and is clamped
    /// to its last sample.
    pub fn new(series: SampleSeries, onset_index: SampleIndex) -> Self {
        let onset_index = onset_index.min(series.len() - 1);
        Self {
            series,
            onset_index,
        }
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn onset_index(&self) -> SampleIndex {
        self.onset_index
    }
}

/// Events in onset order, each with its waveform and measurements.
/// The three lists always have equal length.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct EventTrain {
    events: Vec<DetectedEvent>,
    waveforms: Vec<Waveform>,
    features: Vec<FeatureSet>,
}

impl EventTrain {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DetectedEvent, waveform: Waveform, features: FeatureSet) {
        self.events.push(event);
        self.waveforms.push(waveform);
        self.features.push(features);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[DetectedEvent] {
        &self.events
    }

    pub fn waveforms(&self) -> &[Waveform] {
        &self.waveforms
    }

    pub fn features(&self) -> &[FeatureSet] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DetectedEvent, &Waveform, &FeatureSet)> {
        self.events
            .iter()
            .zip(&self.waveforms)
            .zip(&self.features)
            .map(|((event, waveform), features)| (event, waveform, features))
    }
}
