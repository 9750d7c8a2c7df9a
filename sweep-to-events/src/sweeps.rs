//! JSON documents read and written by the command-line front end.
use crate::event_detection::{Real, datatype::EventTrain};
use ephys_common::{IntoSampleSeries, SampleSeries, SeriesError, Unit};
use serde::{Deserialize, Serialize};

/// One recorded sweep. `raw`, if present, is a second channel on the same
/// time base from which template-matched waveforms may be copied.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepRecord {
    pub name: String,
    pub dt: Real,
    #[serde(default)]
    pub t0: Real,
    pub value_unit: Unit,
    pub time_unit: Unit,
    pub values: Vec<Real>,
    #[serde(default)]
    pub raw: Option<Vec<Real>>,
}

impl SweepRecord {
    pub fn raw_series(&self) -> Option<Result<SampleSeries, SeriesError>> {
        self.raw.as_ref().map(|raw| {
            SampleSeries::new(
                raw.clone(),
                self.dt,
                self.t0,
                self.value_unit.clone(),
                self.time_unit.clone(),
            )
        })
    }
}

impl IntoSampleSeries for &SweepRecord {
    fn into_sample_series(self) -> Result<SampleSeries, SeriesError> {
        SampleSeries::new(
            self.values.clone(),
            self.dt,
            self.t0,
            self.value_unit.clone(),
            self.time_unit.clone(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepFile {
    pub sweeps: Vec<SweepRecord>,
}

/// The events found in one sweep, or the reason it could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<EventTrain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventFile {
    pub sweeps: Vec<SweepOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sweeps() {
        let file: SweepFile = serde_json::from_str(
            r#"{"sweeps": [
                {"name": "a", "dt": 0.1, "value_unit": "mV", "time_unit": "ms", "values": [1, 2, 3]},
                {"name": "b", "dt": 0.1, "t0": 5, "value_unit": "pA", "time_unit": "ms",
                 "values": [1, 2], "raw": [3, 4]}
            ]}"#,
        )
        .unwrap();
        let a = file.sweeps[0].into_sample_series().unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.t0(), 0.0);
        assert!(file.sweeps[0].raw_series().is_none());

        let b = file.sweeps[1].into_sample_series().unwrap();
        let raw = file.sweeps[1].raw_series().unwrap().unwrap();
        assert!(raw.is_aligned_with(&b));
        assert_eq!(raw.value_unit(), &Unit::new("pA"));
    }

    #[test]
    fn invalid_sweeps_fail_at_the_boundary() {
        let record = SweepRecord {
            name: "bad".to_owned(),
            dt: 0.0,
            t0: 0.0,
            value_unit: Unit::new("mV"),
            time_unit: Unit::new("ms"),
            values: vec![1.0],
            raw: None,
        };
        assert_eq!(
            (&record).into_sample_series(),
            Err(SeriesError::InvalidSamplingInterval(0.0))
        );
    }
}
